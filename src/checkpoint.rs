//! Checkpoint system for saving and loading trained networks.

use crate::error::NetworkError;
use crate::neural::{Network, NeuronId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"NNET";

/// A trained network with its session state
#[derive(Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    pub network: Network,
}

/// Same layout as `Checkpoint`, without taking ownership of the network
#[derive(Serialize)]
struct CheckpointRef<'a> {
    version: u32,
    network: &'a Network,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    pub fn new(network: Network) -> Self {
        Self {
            version: Self::VERSION,
            network,
        }
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        Self::write(&self.network, path)
    }

    /// Save `network` without moving it into a checkpoint
    pub fn write<P: AsRef<Path>>(network: &Network, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        let encoded = bincode::serialize(&CheckpointRef {
            version: Self::VERSION,
            network,
        })?;
        writer.write_all(&encoded)?;
        writer.flush()?;

        log::info!("Checkpoint saved: {}", path.as_ref().display());
        Ok(())
    }

    /// Load checkpoint from binary file.
    ///
    /// The restored network is validated, and the neuron id counter is moved
    /// past every restored id.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("Invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        checkpoint.network.validate()?;
        if let Some(id) = checkpoint.network.max_neuron_id() {
            NeuronId::reserve_past(id);
        }

        log::info!(
            "Checkpoint loaded: {} (topology {})",
            path.as_ref().display(),
            checkpoint.network.topology()
        );
        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize + MAGIC.len()
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Serialization(bincode::Error),
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
    /// The stored network violates a structural invariant
    Invalid(NetworkError),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
            Self::Invalid(e) => write!(f, "Invalid network: {}", e),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<NetworkError> for CheckpointError {
    fn from(e: NetworkError) -> Self {
        Self::Invalid(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{Neuron, Stage};
    use tempfile::tempdir;

    fn create_test_network() -> Network {
        let mut network = Network::new_with_seed(
            Stage::single_of(4),
            Stage::grouped_of(&[3, 2]),
            Stage::single_of(2),
            12345,
        )
        .unwrap();
        network.set_categories(&["cat", "dog"]);
        network.set_epoch(7);
        network
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.bin");
        let network = create_test_network();

        Checkpoint::write(&network, &path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap().into_network();

        assert_eq!(loaded.topology(), network.topology());
        assert_eq!(loaded.synapse_weights(), network.synapse_weights());
        assert_eq!(loaded.categories(), network.categories());
        assert_eq!(loaded.epoch(), Some(7));
    }

    #[test]
    fn test_ids_stay_unique_after_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.bin");
        let network = create_test_network();
        Checkpoint::new(network).save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap();
        let max = loaded.network.max_neuron_id().unwrap();
        assert!(Neuron::new().id() > max);
    }

    #[test]
    fn test_invalid_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.bin");
        std::fs::write(&path, b"XXXXpayload").unwrap();

        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_checkpoint_size() {
        let checkpoint = Checkpoint::new(create_test_network());
        let size = checkpoint.size_bytes();
        assert!(size > MAGIC.len());
        assert!(size < 1_000_000);
    }
}
