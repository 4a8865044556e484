use std::ops::Index;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::Stop;

/// Maps external stop keys to graph indices and back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopIndex {
    keys: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl StopIndex {
    /// Index 0 is the first stop. A repeated key keeps its first index.
    pub fn init(stops: &[Stop]) -> Self {
        let keys: Vec<String> = stops.iter().map(|stop| stop.key.clone()).collect();
        let mut index = FxHashMap::default();
        for (i, key) in keys.iter().enumerate() {
            index.entry(key.clone()).or_insert(i);
        }

        Self { keys, index }
    }

    pub fn num_nodes(&self) -> usize {
        self.keys.len()
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn key(&self, node: usize) -> &str {
        &self.keys[node]
    }
}

impl Index<&str> for StopIndex {
    type Output = usize;

    fn index(&self, key: &str) -> &Self::Output {
        &self.index[key]
    }
}
