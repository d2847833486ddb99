use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

/// The external slot a gene is bound to.
///
/// A slider exposes one tick-valued parameter. A pool slot is one entry of a
/// multi-value gene pool, addressed by its position within that pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneSlot {
    Slider { template_id: Uuid },
    PoolSlot { pool_id: Uuid, index: usize },
}

impl GeneSlot {
    pub fn slider(template_id: Uuid) -> Self {
        Self::Slider { template_id }
    }

    pub fn pool_slot(pool_id: Uuid, index: usize) -> Self {
        Self::PoolSlot { pool_id, index }
    }

    /// Id of the external object that owns this slot.
    pub fn template_id(&self) -> Uuid {
        match self {
            Self::Slider { template_id } => *template_id,
            Self::PoolSlot { pool_id, .. } => *pool_id,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeneError {
    #[error("TickOutOfRange: tick value must be within [0, {tick_count}], got {tick_value}")]
    TickOutOfRange { tick_value: u32, tick_count: u32 },
    #[error("InvalidPoolIndex: pool index must be -1 (slider) or non-negative, got {0}")]
    InvalidPoolIndex(i64),
}

/// One discrete parameter with a stable identity.
///
/// Only `tick_value` changes over the lifetime of a gene, and only through
/// [`Gene::mutate_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeneRecord", into = "GeneRecord")]
pub struct Gene {
    id: Uuid,
    slot: GeneSlot,
    name: String,
    tick_count: u32,
    tick_value: u32,
}

impl Gene {
    pub fn new(slot: GeneSlot, name: &str, tick_count: u32) -> Self {
        Self::with_id(Uuid::now_v7(), slot, name, tick_count)
    }

    pub fn with_id(id: Uuid, slot: GeneSlot, name: &str, tick_count: u32) -> Self {
        Self {
            id,
            slot,
            name: name.to_string(),
            tick_count,
            tick_value: 0,
        }
    }

    /// Same identity, live tick count from the registry, value reset to zero.
    pub(crate) fn resolved(&self, tick_count: u32) -> Self {
        Self {
            id: self.id,
            slot: self.slot,
            name: self.name.clone(),
            tick_count,
            tick_value: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn slot(&self) -> &GeneSlot {
        &self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    pub fn tick_value(&self) -> u32 {
        self.tick_value
    }

    #[instrument(level = "debug", skip(self), fields(gene_id = %self.id, tick_count = self.tick_count))]
    pub fn mutate_value(&mut self, tick_value: u32) -> Result<(), GeneError> {
        if tick_value > self.tick_count {
            return Err(GeneError::TickOutOfRange {
                tick_value,
                tick_count: self.tick_count,
            });
        }

        self.tick_value = tick_value;
        Ok(())
    }
}

/// Flat wire shape of a gene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GeneRecord {
    tick_value: u32,
    gene_guid: Uuid,
    tick_count: u32,
    gene_name: String,
    gh_instance_guid: Uuid,
    gene_pool_index: i64,
}

impl From<Gene> for GeneRecord {
    fn from(gene: Gene) -> Self {
        let gene_pool_index = match gene.slot {
            GeneSlot::Slider { .. } => -1,
            GeneSlot::PoolSlot { index, .. } => index as i64,
        };

        Self {
            tick_value: gene.tick_value,
            gene_guid: gene.id,
            tick_count: gene.tick_count,
            gene_name: gene.name,
            gh_instance_guid: gene.slot.template_id(),
            gene_pool_index,
        }
    }
}

impl TryFrom<GeneRecord> for Gene {
    type Error = GeneError;

    fn try_from(record: GeneRecord) -> Result<Self, Self::Error> {
        let slot = match record.gene_pool_index {
            -1 => GeneSlot::slider(record.gh_instance_guid),
            index if index >= 0 => GeneSlot::pool_slot(record.gh_instance_guid, index as usize),
            index => return Err(GeneError::InvalidPoolIndex(index)),
        };

        let mut gene = Gene::with_id(record.gene_guid, slot, &record.gene_name, record.tick_count);
        gene.mutate_value(record.tick_value)?;
        Ok(gene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_rejects_tick_values_above_tick_count() {
        let mut gene = Gene::new(GeneSlot::slider(Uuid::now_v7()), "width", 10);

        assert!(gene.mutate_value(10).is_ok());
        assert_eq!(gene.tick_value(), 10);

        assert_eq!(
            gene.mutate_value(11),
            Err(GeneError::TickOutOfRange {
                tick_value: 11,
                tick_count: 10
            })
        );
        assert_eq!(gene.tick_value(), 10);
    }

    #[test]
    fn it_keeps_identity_when_resolved() {
        let mut gene = Gene::new(GeneSlot::pool_slot(Uuid::now_v7(), 3), "pool", 4);
        gene.mutate_value(2).unwrap();

        let resolved = gene.resolved(20);
        assert_eq!(resolved.id(), gene.id());
        assert_eq!(resolved.slot(), gene.slot());
        assert_eq!(resolved.tick_count(), 20);
        assert_eq!(resolved.tick_value(), 0);
    }

    #[test]
    fn it_serializes_the_flat_gene_record() {
        let template_id = Uuid::now_v7();
        let mut gene = Gene::new(GeneSlot::slider(template_id), "height", 8);
        gene.mutate_value(5).unwrap();

        let json = serde_json::to_value(&gene).unwrap();
        assert_eq!(json["TickValue"], 5);
        assert_eq!(json["TickCount"], 8);
        assert_eq!(json["GeneName"], "height");
        assert_eq!(json["GenePoolIndex"], -1);
        assert_eq!(json["GhInstanceGuid"], template_id.to_string());

        let back: Gene = serde_json::from_value(json).unwrap();
        assert_eq!(back, gene);
    }

    #[test]
    fn it_decodes_pool_slots_and_rejects_bad_records() {
        let pool_id = Uuid::now_v7();
        let json = serde_json::json!({
            "TickValue": 1,
            "GeneGuid": Uuid::now_v7(),
            "TickCount": 3,
            "GeneName": "pool",
            "GhInstanceGuid": pool_id,
            "GenePoolIndex": 2
        });
        let gene: Gene = serde_json::from_value(json).unwrap();
        assert_eq!(gene.slot(), &GeneSlot::pool_slot(pool_id, 2));

        let out_of_range = serde_json::json!({
            "TickValue": 9,
            "GeneGuid": Uuid::now_v7(),
            "TickCount": 3,
            "GeneName": "pool",
            "GhInstanceGuid": pool_id,
            "GenePoolIndex": 0
        });
        assert!(serde_json::from_value::<Gene>(out_of_range).is_err());
    }
}
