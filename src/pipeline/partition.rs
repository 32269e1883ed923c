use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::models::{Lead, Stage};
use crate::pipeline::ranking::rank_bucket;

/// Leads grouped into one ranked bucket per stage. Every stage has a bucket, possibly empty.
#[derive(Debug, Clone)]
pub struct Partitioned<'a> {
    buckets: [Vec<&'a Lead>; Stage::COUNT],
}

impl<'a> Partitioned<'a> {
    pub fn bucket(&self, stage: Stage) -> &[&'a Lead] {
        &self.buckets[stage.index()]
    }

    /// Buckets in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &[&'a Lead])> + '_ {
        Stage::ALL
            .into_iter()
            .map(move |stage| (stage, self.bucket(stage)))
    }

    pub fn total_leads(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn position_of(&self, lead_id: &str) -> Option<(Stage, usize)> {
        self.iter().find_map(|(stage, bucket)| {
            bucket
                .iter()
                .position(|lead| lead.id == lead_id)
                .map(|index| (stage, index))
        })
    }

    pub fn to_map(&self) -> BTreeMap<Stage, Vec<&'a Lead>> {
        self.iter()
            .map(|(stage, bucket)| (stage, bucket.to_vec()))
            .collect()
    }
}

impl Serialize for Partitioned<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(stage, bucket)| (stage.as_str(), bucket)))
    }
}

/// Group `leads` by stage and rank each bucket. Input order decides ties.
pub fn partition<'a, I>(leads: I) -> Partitioned<'a>
where
    I: IntoIterator<Item = &'a Lead>,
{
    let mut buckets: [Vec<&'a Lead>; Stage::COUNT] = std::array::from_fn(|_| Vec::new());
    for lead in leads {
        buckets[lead.stage.index()].push(lead);
    }
    for bucket in &mut buckets {
        rank_bucket(bucket);
    }
    Partitioned { buckets }
}
