//! # neuronet
//!
//! Feed-forward neural network built from individually wired neurons,
//! trained by backpropagation on folders of labelled images.
//!
//! ## Features
//!
//! - **Neuron graph**: every neuron owns its outgoing synapses; edges refer to
//!   upstream neurons by handle, never by ownership
//! - **Staged topology**: single-layer input/output stages around a stack of
//!   hidden groups
//! - **Numerical gradients**: weight updates use a forward finite difference
//!   of the activation function
//! - **Reproducible**: seeded weight initialisation
//! - **Configurable**: JSON or YAML configuration files
//!
//! ## Quick Start
//!
//! ```rust
//! use neuronet::neural::{Network, Stage};
//!
//! let mut network = Network::new_with_seed(
//!     Stage::single_of(4),
//!     Stage::grouped_of(&[3]),
//!     Stage::single_of(2),
//!     42,
//! )
//! .unwrap();
//!
//! network.learn(&[0.9, 0.8, 0.1, 0.2], "cat");
//! let outputs = network.outputs();
//! assert_eq!(outputs.len(), 2);
//! ```
//!
//! ## Training on a dataset
//!
//! ```rust,no_run
//! use neuronet::Config;
//!
//! let config = Config::from_file("dataset/config.json").unwrap();
//! let mut network = config.build_network("dataset").unwrap();
//!
//! let summary = network.education().unwrap();
//! println!("{}", summary);
//!
//! let categories = network.perception("dataset/cat/001.png");
//! println!("{:?}", categories);
//! ```

pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod neural;
pub mod stats;

// Re-export main types
pub use config::Config;
pub use error::NetworkError;
pub use neural::Network;
pub use stats::{EvaluationReport, TrainingSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
