//! In-memory chain storage: one hash-linked chain per device serial number.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Block, Payload, Record};

/// All device chains plus the shared genesis anchor.
///
/// The first block of every chain links to the genesis block: its index is
/// `genesis.sequence_index + 1` and its previous hash is `genesis.hash`.
#[derive(Debug)]
pub struct ChainStore {
    genesis: Block,
    chains: BTreeMap<String, Vec<Block>>,
}

impl Default for ChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStore {
    pub fn new() -> Self {
        Self {
            genesis: Block::genesis(),
            chains: BTreeMap::new(),
        }
    }

    pub fn genesis(&self) -> &Block {
        &self.genesis
    }

    /// Last block of the chain for `serial`, or genesis for an unseen serial.
    fn head(&self, serial: &str) -> &Block {
        self.chains
            .get(serial)
            .and_then(|chain| chain.last())
            .unwrap_or(&self.genesis)
    }

    /// Append `record` to the chain keyed by its serial number.
    /// Always creates a new block; there is no deduplication.
    pub fn append(&mut self, record: Record) -> Block {
        let (next_index, prev_hash) = {
            let head = self.head(&record.serial_number);
            (head.sequence_index + 1, head.hash.clone())
        };
        let serial = record.serial_number.clone();
        let block = Block::new(next_index, Payload::Device(record), prev_hash);

        tracing::debug!(
            serial = %serial,
            index = block.sequence_index,
            hash = %block.hash,
            "appended block"
        );
        self.chains.entry(serial).or_default().push(block.clone());
        block
    }

    /// Blocks for `serial`, oldest first; empty if the serial is unknown.
    pub fn lookup(&self, serial: &str) -> &[Block] {
        self.chains.get(serial).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Block at `position` (0-based) within the chain for `serial`.
    pub fn block_at(&self, serial: &str, position: usize) -> Option<&Block> {
        self.lookup(serial).get(position)
    }

    pub fn all_chains(&self) -> &BTreeMap<String, Vec<Block>> {
        &self.chains
    }

    /// Number of distinct serial numbers.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Recompute every hash in the chain and check its linkage.
    pub fn chain_faults(&self, serial: &str) -> Vec<ChainFault> {
        let mut faults = vec![];
        let mut prev = &self.genesis;

        for (position, block) in self.lookup(serial).iter().enumerate() {
            if block.sequence_index != prev.sequence_index + 1 {
                faults.push(ChainFault::IndexGap {
                    position,
                    expected: prev.sequence_index + 1,
                    found: block.sequence_index,
                });
            }
            if block.previous_hash != prev.hash {
                faults.push(ChainFault::BrokenLink { position });
            }
            if block.recompute_hash() != block.hash {
                faults.push(ChainFault::HashMismatch { position });
            }
            if block
                .record()
                .is_some_and(|r| r.serial_number != serial)
            {
                faults.push(ChainFault::ForeignRecord { position });
            }
            prev = block;
        }

        if !faults.is_empty() {
            tracing::warn!(serial = %serial, faults = faults.len(), "chain verification failed");
        }
        faults
    }

    /// True when no fault is found. Unknown serials verify trivially.
    pub fn verify_chain(&self, serial: &str) -> bool {
        self.chain_faults(serial).is_empty()
    }
}

/// A single inconsistency found while verifying a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainFault {
    IndexGap {
        position: usize,
        expected: u64,
        found: u64,
    },
    BrokenLink {
        position: usize,
    },
    HashMismatch {
        position: usize,
    },
    ForeignRecord {
        position: usize,
    },
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFault::IndexGap {
                position,
                expected,
                found,
            } => write!(
                f,
                "block {position} has index {found}, expected {expected}"
            ),
            ChainFault::BrokenLink { position } => {
                write!(f, "block {position} previous_hash mismatch")
            }
            ChainFault::HashMismatch { position } => {
                write!(f, "block {position} hash mismatch")
            }
            ChainFault::ForeignRecord { position } => {
                write!(f, "block {position} belongs to another serial number")
            }
        }
    }
}
