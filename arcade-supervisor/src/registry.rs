//! Worker registry: static definitions plus the table of live handles
//!
//! Every defined name owns a [`Slot`]. The slot's operation lock serializes
//! start and stop for that name only, so a slow start of one worker never
//! blocks another. The published state and handle sit behind a short-lived
//! read/write lock and are copied out for inspection.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use arcade_config::{WorkerDefinition, WorkersConfig};

use crate::error::{SupervisorError, SupervisorResult};
use crate::handle::{WorkerHandle, WorkerState};
use crate::probe::DependencyProber;

/// The program chosen for one start attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub program: PathBuf,
    pub used_fallback: bool,
    /// Required capabilities found missing while resolving
    pub missing: Vec<String>,
}

#[derive(Debug)]
struct SlotEntry {
    state: WorkerState,
    handle: Option<WorkerHandle>,
}

/// Per-name lock pair
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) op: tokio::sync::Mutex<()>,
    entry: RwLock<SlotEntry>,
}

impl Slot {
    fn new() -> Self {
        Self {
            op: tokio::sync::Mutex::new(()),
            entry: RwLock::new(SlotEntry {
                state: WorkerState::Absent,
                handle: None,
            }),
        }
    }

    pub(crate) fn handle(&self) -> Option<WorkerHandle> {
        self.entry.read().handle.clone()
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.entry.read().state
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.entry.write().state = state;
    }

    pub(crate) fn publish(&self, handle: WorkerHandle) {
        let mut entry = self.entry.write();
        entry.state = WorkerState::Running;
        entry.handle = Some(handle);
    }

    /// Return the state to what the published handle implies
    pub(crate) fn restore_state(&self) {
        let mut entry = self.entry.write();
        entry.state = if entry.handle.is_some() {
            WorkerState::Running
        } else {
            WorkerState::Absent
        };
    }

    /// Remove the handle, returning the name to `Absent`
    pub(crate) fn clear(&self) -> Option<WorkerHandle> {
        let mut entry = self.entry.write();
        entry.state = WorkerState::Absent;
        entry.handle.take()
    }

    /// Remove the handle only if it still refers to `handle`'s process
    pub(crate) fn clear_if_same(&self, handle: &WorkerHandle) -> bool {
        let mut entry = self.entry.write();
        match &entry.handle {
            Some(current) if current.same_process(handle) => {
                entry.handle = None;
                entry.state = WorkerState::Absent;
                true
            }
            _ => false,
        }
    }
}

/// Worker definitions keyed by name, and one slot per definition
#[derive(Debug)]
pub struct WorkerRegistry {
    base_dir: PathBuf,
    definitions: BTreeMap<String, WorkerDefinition>,
    slots: HashMap<String, Arc<Slot>>,
}

impl WorkerRegistry {
    /// Build a registry; duplicate names are rejected
    pub fn new(
        definitions: impl IntoIterator<Item = WorkerDefinition>,
        base_dir: impl Into<PathBuf>,
    ) -> SupervisorResult<Self> {
        let mut by_name = BTreeMap::new();
        let mut slots = HashMap::new();

        for definition in definitions {
            if definition.name.trim().is_empty() {
                return Err(SupervisorError::InvalidRegistry(
                    "worker name cannot be empty".to_string(),
                ));
            }
            let name = definition.name.clone();
            if by_name.insert(name.clone(), definition).is_some() {
                return Err(SupervisorError::InvalidRegistry(format!(
                    "duplicate worker name '{}'",
                    name
                )));
            }
            slots.insert(name, Arc::new(Slot::new()));
        }

        Ok(Self {
            base_dir: base_dir.into(),
            definitions: by_name,
            slots,
        })
    }

    pub fn from_config(config: &WorkersConfig) -> SupervisorResult<Self> {
        Self::new(config.definitions.iter().cloned(), config.base_dir.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Defined worker names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> SupervisorResult<&WorkerDefinition> {
        self.definitions
            .get(name)
            .ok_or_else(|| SupervisorError::UnknownWorker {
                worker: name.to_string(),
            })
    }

    /// Copy of the live handle for `name`, if any
    pub fn handle(&self, name: &str) -> Option<WorkerHandle> {
        self.slots.get(name).and_then(|slot| slot.handle())
    }

    /// Current lifecycle state of `name`
    pub fn state(&self, name: &str) -> WorkerState {
        self.slots
            .get(name)
            .map(|slot| slot.state())
            .unwrap_or(WorkerState::Absent)
    }

    pub(crate) fn slot(&self, name: &str) -> SupervisorResult<Arc<Slot>> {
        self.slots
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::UnknownWorker {
                worker: name.to_string(),
            })
    }

    /// Resolve a program path against the base directory
    pub fn program_path(&self, program: &Path) -> PathBuf {
        if program.is_absolute() {
            program.to_path_buf()
        } else {
            self.base_dir.join(program)
        }
    }

    /// Choose the program to launch for `name`
    ///
    /// When a required capability is missing the fallback program is used if
    /// one is defined; otherwise the primary program is kept and the missing
    /// capabilities are reported in the resolution.
    pub async fn resolve(
        &self,
        name: &str,
        prober: &dyn DependencyProber,
    ) -> SupervisorResult<Resolution> {
        let definition = self.definition(name)?;
        let missing = prober.missing(&definition.requires).await;

        if missing.is_empty() {
            return Ok(Resolution {
                program: self.program_path(&definition.program),
                used_fallback: false,
                missing,
            });
        }

        match &definition.fallback {
            Some(fallback) => {
                warn!(
                    "Worker '{}' is missing {}, using fallback program {}",
                    name,
                    missing.join(", "),
                    fallback.display()
                );
                Ok(Resolution {
                    program: self.program_path(fallback),
                    used_fallback: true,
                    missing,
                })
            }
            None => {
                warn!(
                    "Worker '{}' is missing {} and has no fallback, starting anyway",
                    name,
                    missing.join(", ")
                );
                Ok(Resolution {
                    program: self.program_path(&definition.program),
                    used_fallback: false,
                    missing,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProber;

    fn registry() -> WorkerRegistry {
        WorkerRegistry::new(
            vec![
                WorkerDefinition::new("color", "color_identifier.py"),
                WorkerDefinition::new("gesture", "gesture_recognition.py")
                    .with_fallback("gesture_recognition_fallback.py")
                    .requires("mediapipe"),
                WorkerDefinition::new("emotion", "/opt/games/emotion_game.py").requires("fer"),
            ],
            "face",
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = WorkerRegistry::new(
            vec![
                WorkerDefinition::new("color", "a.py"),
                WorkerDefinition::new("color", "b.py"),
            ],
            ".",
        )
        .unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidRegistry(_)));
    }

    #[test]
    fn test_names_and_lookup() {
        let registry = registry();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["color", "emotion", "gesture"]);
        assert!(registry.contains("color"));
        assert!(matches!(
            registry.definition("tetris"),
            Err(SupervisorError::UnknownWorker { .. })
        ));
        assert_eq!(registry.state("color"), WorkerState::Absent);
        assert!(registry.handle("color").is_none());
    }

    #[tokio::test]
    async fn test_resolve_primary_when_capabilities_present() {
        let registry = registry();
        let resolution = registry
            .resolve("gesture", &StaticProber::new(["mediapipe"]))
            .await
            .unwrap();
        assert_eq!(resolution.program, PathBuf::from("face/gesture_recognition.py"));
        assert!(!resolution.used_fallback);
        assert!(resolution.missing.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_fallback_when_capability_missing() {
        let registry = registry();
        let resolution = registry.resolve("gesture", &StaticProber::none()).await.unwrap();
        assert_eq!(
            resolution.program,
            PathBuf::from("face/gesture_recognition_fallback.py")
        );
        assert!(resolution.used_fallback);
        assert_eq!(resolution.missing, vec!["mediapipe".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_without_fallback_keeps_primary() {
        let registry = registry();
        let resolution = registry.resolve("emotion", &StaticProber::none()).await.unwrap();
        assert_eq!(resolution.program, PathBuf::from("/opt/games/emotion_game.py"));
        assert!(!resolution.used_fallback);
        assert_eq!(resolution.missing, vec!["fer".to_string()]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_worker() {
        let registry = registry();
        let err = registry.resolve("pong", &StaticProber::none()).await.unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_WORKER");
    }
}
