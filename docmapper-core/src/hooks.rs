//! Lifecycle hooks and the dispatcher that runs them.
//!
//! A record opts into hooks by implementing [`Hooks`] and returning itself from
//! [`Record::as_hooks`]. Every method of [`Hooks`] has a no-op default, so a record
//! only writes the stages it cares about. Stages run in a fixed order around each
//! mutation:
//!
//! | Operation | Order |
//! |---|---|
//! | insert | `PreInsert` → mutation → `PostInsert` |
//! | update | `PreUpdate` → mutation → `PostUpdate` |
//! | delete | `PreDelete` → mutation → `PostDelete` |
//!
//! A hook error aborts the operation at that point. Hooks may mutate the record in
//! place; nothing is restored when a later stage fails.
//!
//! # Example
//!
//! ```ignore
//! impl Hooks for User {
//!     fn pre_insert(&mut self, _ctx: &HookContext<'_>) -> HookResult {
//!         self.created = chrono::Utc::now().timestamp();
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult, HookError},
    record::Record,
};

/// Result type returned by hook methods.
pub type HookResult = Result<(), HookError>;

/// One of the six lifecycle points around a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    PreInsert,
    PostInsert,
    PreUpdate,
    PostUpdate,
    PreDelete,
    PostDelete,
}

impl HookStage {
    /// All stages, in declaration order.
    pub const ALL: [HookStage; 6] = [
        HookStage::PreInsert,
        HookStage::PostInsert,
        HookStage::PreUpdate,
        HookStage::PostUpdate,
        HookStage::PreDelete,
        HookStage::PostDelete,
    ];

    /// The stage name, e.g. `"PreInsert"`.
    pub const fn name(&self) -> &'static str {
        match self {
            HookStage::PreInsert => "PreInsert",
            HookStage::PostInsert => "PostInsert",
            HookStage::PreUpdate => "PreUpdate",
            HookStage::PostUpdate => "PostUpdate",
            HookStage::PreDelete => "PreDelete",
            HookStage::PostDelete => "PostDelete",
        }
    }

    /// Whether this stage runs before its mutation.
    pub const fn is_pre(&self) -> bool {
        matches!(self, HookStage::PreInsert | HookStage::PreUpdate | HookStage::PreDelete)
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Information handed to every hook invocation.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    stage: HookStage,
    collection: &'a str,
}

impl<'a> HookContext<'a> {
    pub fn new(stage: HookStage, collection: &'a str) -> Self {
        Self { stage, collection }
    }

    /// The stage being run.
    pub fn stage(&self) -> HookStage {
        self.stage
    }

    /// The collection the mutation targets.
    pub fn collection(&self) -> &'a str {
        self.collection
    }
}

/// Optional lifecycle callbacks of a record.
///
/// Bulk operations (`insert_all`, `update_all`, `delete_all`) never call these.
pub trait Hooks {
    fn pre_insert(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    fn post_insert(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    fn pre_update(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    fn post_update(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    fn pre_delete(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }

    fn post_delete(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        Ok(())
    }
}

/// Probes a record for hooks and runs the one matching a stage.
pub struct HookDispatcher;

impl HookDispatcher {
    /// Runs the hook for `stage` on `record`.
    ///
    /// Records without hooks are skipped silently. A hook error is returned as
    /// [`DocumentStoreError::Hook`] with the original error as its source.
    pub fn invoke<R: Record>(
        stage: HookStage,
        record: &mut R,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let Some(hooks) = record.as_hooks() else {
            return Ok(());
        };

        log::trace!("running {} hook on {}", stage, collection);

        let ctx = HookContext::new(stage, collection);
        let result = match stage {
            HookStage::PreInsert => hooks.pre_insert(&ctx),
            HookStage::PostInsert => hooks.post_insert(&ctx),
            HookStage::PreUpdate => hooks.pre_update(&ctx),
            HookStage::PostUpdate => hooks.post_update(&ctx),
            HookStage::PreDelete => hooks.pre_delete(&ctx),
            HookStage::PostDelete => hooks.post_delete(&ctx),
        };

        result.map_err(|source| DocumentStoreError::hook(stage, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CollectionNamed, Record};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Probe {
        #[serde(skip)]
        seen: Vec<(HookStage, String)>,
        #[serde(skip)]
        fail_on: Option<HookStage>,
    }

    impl CollectionNamed for Probe {
        fn collection_name(&self) -> &str {
            "probes"
        }
    }

    impl Probe {
        fn record(&mut self, ctx: &HookContext<'_>) -> HookResult {
            self.seen.push((ctx.stage(), ctx.collection().to_string()));
            match self.fail_on {
                Some(stage) if stage == ctx.stage() => Err(format!("refused {}", stage).into()),
                _ => Ok(()),
            }
        }
    }

    impl Hooks for Probe {
        fn pre_insert(&mut self, ctx: &HookContext<'_>) -> HookResult {
            self.record(ctx)
        }

        fn post_delete(&mut self, ctx: &HookContext<'_>) -> HookResult {
            self.record(ctx)
        }
    }

    impl Record for Probe {
        fn as_collection_named(&self) -> Option<&dyn CollectionNamed> {
            Some(self)
        }

        fn as_hooks(&mut self) -> Option<&mut dyn Hooks> {
            Some(self)
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Plain {
        name: String,
    }

    impl Record for Plain {}

    #[test]
    fn dispatches_only_the_requested_stage() {
        let mut probe = Probe::default();

        for stage in HookStage::ALL {
            HookDispatcher::invoke(stage, &mut probe, "probes").unwrap();
        }

        assert_eq!(
            probe.seen,
            vec![
                (HookStage::PreInsert, "probes".to_string()),
                (HookStage::PostDelete, "probes".to_string()),
            ]
        );
    }

    #[test]
    fn records_without_hooks_are_skipped() {
        let mut plain = Plain { name: "x".into() };

        for stage in HookStage::ALL {
            assert!(HookDispatcher::invoke(stage, &mut plain, "plain").is_ok());
        }
    }

    #[test]
    fn hook_errors_keep_stage_and_source() {
        let mut probe = Probe { fail_on: Some(HookStage::PreInsert), ..Default::default() };

        let err = HookDispatcher::invoke(HookStage::PreInsert, &mut probe, "probes").unwrap_err();

        assert_eq!(err.hook_stage(), Some(HookStage::PreInsert));
        assert_eq!(err.hook_source().unwrap().to_string(), "refused PreInsert");
        assert!(err.is_side_effect_free());
    }

    #[test]
    fn stage_names() {
        assert_eq!(HookStage::PostUpdate.to_string(), "PostUpdate");
        assert!(HookStage::PreDelete.is_pre());
        assert!(!HookStage::PostInsert.is_pre());
    }
}
