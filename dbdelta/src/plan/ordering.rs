use crate::delta::{DeltaScript, DeltaScriptCategory};
use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use crate::module::Module;
use crate::version::Version;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The direction a migration artifact moves the schema in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    Upgrade,
    Rollback,
}

impl MigrationDirection {
    pub const ALL: [MigrationDirection; 2] = [MigrationDirection::Upgrade, MigrationDirection::Rollback];

    /// The script category holding this direction's directional scripts.
    pub fn category(&self) -> DeltaScriptCategory {
        match self {
            MigrationDirection::Upgrade => DeltaScriptCategory::Upgrade,
            MigrationDirection::Rollback => DeltaScriptCategory::Rollback,
        }
    }

    pub fn label(&self) -> &'static str {
        self.category().label()
    }
}

impl Display for MigrationDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where bidirectional scripts go in an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidirectionalPlacement {
    /// After every directional script
    #[default]
    Last,
    /// Left out of the artifact
    Exclude,
}

/// The ordered scripts of one artifact.
///
/// Directional scripts always precede bidirectional ones; each segment is
/// ascending by sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionPlan {
    direction: MigrationDirection,
    module: Module,
    version: Version,
    placement: BidirectionalPlacement,
    directional: Vec<DeltaScript>,
    bidirectional: Vec<DeltaScript>,
}

impl CompositionPlan {
    pub fn direction(&self) -> MigrationDirection {
        self.direction
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn placement(&self) -> BidirectionalPlacement {
        self.placement
    }

    pub fn directional(&self) -> &[DeltaScript] {
        &self.directional
    }

    pub fn bidirectional(&self) -> &[DeltaScript] {
        &self.bidirectional
    }

    /// Scripts across both segments.
    pub fn script_count(&self) -> usize {
        self.directional.len() + self.bidirectional.len()
    }

    /// A plan without directional scripts produces no artifact.
    pub fn is_empty(&self) -> bool {
        self.directional.is_empty()
    }

    /// Every script in emission order.
    pub fn scripts(&self) -> impl Iterator<Item = &DeltaScript> {
        self.directional.iter().chain(self.bidirectional.iter())
    }
}

/// Arranges validated scripts into [CompositionPlan]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptOrderingEngine {
    upgrade_placement: BidirectionalPlacement,
    rollback_placement: BidirectionalPlacement,
}

impl ScriptOrderingEngine {
    pub fn new(upgrade_placement: BidirectionalPlacement, rollback_placement: BidirectionalPlacement) -> Self {
        ScriptOrderingEngine {
            upgrade_placement,
            rollback_placement,
        }
    }

    pub fn placement_for(&self, direction: MigrationDirection) -> BidirectionalPlacement {
        match direction {
            MigrationDirection::Upgrade => self.upgrade_placement,
            MigrationDirection::Rollback => self.rollback_placement,
        }
    }

    pub fn plan(
        &self,
        direction: MigrationDirection,
        module: &Module,
        version: &Version,
        directional: Vec<DeltaScript>,
        bidirectional: Vec<DeltaScript>,
    ) -> MigrationResult<CompositionPlan> {
        let directional = ordered(directional, direction.category())?;
        let placement = self.placement_for(direction);
        let bidirectional = match placement {
            BidirectionalPlacement::Last => ordered(bidirectional, DeltaScriptCategory::Bidirectional)?,
            BidirectionalPlacement::Exclude => {
                if !bidirectional.is_empty() {
                    log::debug!(
                        "Excluding {} bidirectional script(s) from the {} of {}/{}",
                        bidirectional.len(),
                        direction,
                        module.name(),
                        version.name()
                    );
                }
                Vec::new()
            }
        };

        Ok(CompositionPlan {
            direction,
            module: module.clone(),
            version: version.clone(),
            placement,
            directional,
            bidirectional,
        })
    }
}

fn ordered(scripts: Vec<DeltaScript>, category: DeltaScriptCategory) -> MigrationResult<Vec<DeltaScript>> {
    let scripts: Vec<DeltaScript> = scripts.into_iter().sorted().collect();
    let repeated: Vec<u32> = scripts.iter().map(|s| s.sequence_number()).duplicates().collect();
    if !repeated.is_empty() {
        log::error!("Repeated {} sequence numbers: {:?}", category, repeated);
        return Err(MigrationError::new(
            ErrorKind::InvalidScriptSequence,
            &format!("repeated {} sequence numbers: {}", category, repeated.iter().join(", ")),
        ));
    }
    Ok(scripts)
}
