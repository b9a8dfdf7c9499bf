use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;

use crate::error::{SlideError, SlideResult};
use crate::hash::family::{HashFamily, HashKind};
use crate::math::init::{mix_seed, splitmix64};
use crate::math::VectorRef;

/// Default bound on ids kept per bucket.
pub const DEFAULT_BUCKET_SIZE: usize = 128;

/// Node ids colliding on one table code.
///
/// Once full, the bucket keeps a uniform sample of every id offered since it
/// was last cleared (reservoir sampling), so no id range is favoured.
#[derive(Debug, Clone, Default)]
struct Bucket {
    ids: Vec<u32>,
    /// Distinct ids offered since the last clear.
    seen: u64,
}

impl Bucket {
    fn clear(&mut self) {
        self.ids.clear();
        self.seen = 0;
    }
}

/// Bucket occupancy figures, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Occupancy {
    /// Non-empty buckets over all tables.
    pub buckets: usize,
    /// Stored ids over all tables (an id counts once per table).
    pub entries: usize,
    /// Fullest bucket.
    pub largest: usize,
}

/// L bucket arrays of `2^range_pow` buckets each, holding node ids.
///
/// Buckets are materialized on first insert, so untouched buckets cost
/// nothing. The table stores ids only; vectors are passed in by the owner.
/// Buckets of a `Constant` family are never bounded: every id shares one
/// bucket per table and must stay retrievable.
#[derive(Debug, Clone)]
pub struct HashTable {
    family: HashFamily,
    range_pow: u32,
    capacity: usize,
    seed: u64,
    tables: Vec<HashMap<u32, Bucket>>,
}

impl HashTable {
    /// `seed` drives the choice of which id a full bucket gives up.
    pub fn new(family: HashFamily, range_pow: u32, bucket_size: usize, seed: u64) -> SlideResult<HashTable> {
        if !(1..=30).contains(&range_pow) {
            return Err(SlideError::InvalidConfig(format!(
                "range_pow must be in 1..=30, got {range_pow}"
            )));
        }
        if bucket_size == 0 {
            return Err(SlideError::InvalidConfig("bucket_size must be positive".into()));
        }
        let capacity = if family.kind() == HashKind::Constant { usize::MAX } else { bucket_size };
        let tables = (0..family.l()).map(|_| HashMap::new()).collect();
        Ok(HashTable { family, range_pow, capacity, seed, tables })
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn num_buckets(&self) -> usize {
        1 << self.range_pow
    }

    /// Bucket index for a table code: successive `range_pow`-bit chunks XORed.
    pub fn bucket_index(&self, code: u32) -> u32 {
        let mask = (1u32 << self.range_pow) - 1;
        let mut rest = code;
        let mut index = 0;
        while rest != 0 {
            index ^= rest & mask;
            rest >>= self.range_pow;
        }
        index
    }

    pub fn insert(&mut self, id: usize, vector: VectorRef<'_>) {
        let codes = self.family.signatures(vector);
        self.insert_codes(id as u32, &codes);
    }

    fn insert_codes(&mut self, id: u32, codes: &[u32]) {
        for (t, &code) in codes.iter().enumerate() {
            let index = self.bucket_index(code);
            let capacity = self.capacity;
            let slot_seed = mix_seed(self.seed, ((t as u64) << 32) | index as u64);
            let bucket = self.tables[t].entry(index).or_default();
            if bucket.ids.contains(&id) {
                continue;
            }
            bucket.seen += 1;
            if bucket.ids.len() < capacity {
                bucket.ids.push(id);
                continue;
            }
            let pick = (splitmix64(slot_seed ^ bucket.seen) % bucket.seen) as usize;
            if pick < capacity {
                bucket.ids[pick] = id;
            }
        }
    }

    /// Removes `id` from the buckets `vector` maps to. Absent ids are ignored.
    pub fn remove(&mut self, id: usize, vector: VectorRef<'_>) {
        let id = id as u32;
        let codes = self.family.signatures(vector);
        for (t, &code) in codes.iter().enumerate() {
            let index = self.bucket_index(code);
            if let Some(bucket) = self.tables[t].get_mut(&index) {
                bucket.ids.retain(|&x| x != id);
                if bucket.ids.is_empty() {
                    self.tables[t].remove(&index);
                }
            }
        }
    }

    /// Union of the buckets `query` maps to across all tables, sorted by id.
    pub fn retrieve(&self, query: VectorRef<'_>) -> Vec<usize> {
        let mut ids: Vec<usize> = self.retrieve_counts(query).into_keys().collect();
        ids.sort_unstable();
        ids
    }

    /// Candidate id -> number of tables it collided with `query` in.
    pub fn retrieve_counts(&self, query: VectorRef<'_>) -> HashMap<usize, usize> {
        let codes = self.family.signatures(query);
        let mut counts = HashMap::new();
        for (t, &code) in codes.iter().enumerate() {
            if let Some(bucket) = self.tables[t].get(&self.bucket_index(code)) {
                for &id in &bucket.ids {
                    *counts.entry(id as usize).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Contents of the single bucket `vector` maps to in table `table`.
    pub fn table_candidates(&self, table: usize, vector: VectorRef<'_>) -> Vec<usize> {
        let code = self.family.signature(vector, table);
        self.tables[table]
            .get(&self.bucket_index(code))
            .map(|bucket| bucket.ids.iter().map(|&id| id as usize).collect())
            .unwrap_or_default()
    }

    /// Empties every bucket, keeping the allocated storage, then reinserts
    /// each `(id, vector)`. Signatures are computed in parallel; insertion
    /// order follows `nodes`.
    pub fn rehash<'a, I>(&mut self, nodes: I)
    where
        I: IntoParallelIterator<Item = (usize, VectorRef<'a>)>,
        I::Iter: IndexedParallelIterator,
    {
        for table in &mut self.tables {
            for bucket in table.values_mut() {
                bucket.clear();
            }
        }
        let family = &self.family;
        let signed: Vec<(usize, Vec<u32>)> = nodes
            .into_par_iter()
            .map(|(id, vector)| (id, family.signatures(vector)))
            .collect();
        for (id, codes) in &signed {
            self.insert_codes(*id as u32, codes);
        }
        debug!("rehashed {} ids into {} tables", signed.len(), self.tables.len());
    }

    /// Drops all bucket storage, including retained capacity and empty
    /// buckets left behind by churn. The index is empty afterwards.
    pub fn rebuild(&mut self) {
        self.tables = (0..self.family.l()).map(|_| HashMap::new()).collect();
    }

    pub fn occupancy(&self) -> Occupancy {
        let mut occupancy = Occupancy::default();
        for table in &self.tables {
            for bucket in table.values().filter(|b| !b.ids.is_empty()) {
                occupancy.buckets += 1;
                occupancy.entries += bucket.ids.len();
                occupancy.largest = occupancy.largest.max(bucket.ids.len());
            }
        }
        occupancy
    }

    /// Buckets materialized so far, empty ones included.
    pub fn allocated_buckets(&self) -> usize {
        self.tables.iter().map(|t| t.len()).sum()
    }
}
