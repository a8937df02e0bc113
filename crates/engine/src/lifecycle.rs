// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Model lifecycle state machine.
//!
//! ```text
//!           load()              unload(to_cpu=false on cuda OR any on cpu)
//! LOADED ───────────► UNLOADED ◄───────────── LOADED
//!    │                   ▲
//!    │ unload(to_cpu=true, device=cuda)   load(keep_cache=true, device=cuda)
//!    ▼                   │
//! UNLOADED_KEEPING_CPU_CACHE
//! ```
//!
//! This module holds only the pure state transition logic; the dispatch
//! layer pairs it with the actual decoder construction/teardown and is
//! responsible for making each transition atomic with respect to in-flight
//! translate calls.

/// One of the three reachable lifecycle states. `UnloadedKeepingCpuCache`
/// is only reachable when the device is CUDA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    LoadedOnDevice,
    Unloaded,
    UnloadedKeepingCpuCache,
}

impl LifecycleState {
    #[must_use]
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::LoadedOnDevice)
    }
}

/// Whether a transition actually changed state (204) or was a no-op (304).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Changed,
    Unchanged,
}

/// Pure state machine for the model lifecycle. `keep_cache`/`to_cpu` flags
/// are honored only when `is_cuda` is true; otherwise they are silently
/// dropped, per the component's documented invariant.
pub struct LifecycleController {
    state: LifecycleState,
    is_cuda: bool,
}

impl LifecycleController {
    /// Constructs a controller in the initial `LOADED_ON_DEVICE` state.
    #[must_use]
    pub fn new(is_cuda: bool) -> Self {
        Self {
            state: LifecycleState::LoadedOnDevice,
            is_cuda,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns `true` if a reload should reuse a previously retained CPU
    /// cache of weights rather than re-reading the snapshot from disk.
    #[must_use]
    pub fn should_reuse_cpu_cache(&self) -> bool {
        self.state == LifecycleState::UnloadedKeepingCpuCache
    }

    /// `load(keep_cache)`: 204/`Changed` if the state was not
    /// `LOADED_ON_DEVICE` (it now is), 304/`Unchanged` otherwise.
    /// `keep_cache` does not affect the resulting state here — it only
    /// tells the caller whether to skip re-reading weights from disk.
    pub fn request_load(&mut self) -> TransitionOutcome {
        if self.state == LifecycleState::LoadedOnDevice {
            return TransitionOutcome::Unchanged;
        }
        self.state = LifecycleState::LoadedOnDevice;
        TransitionOutcome::Changed
    }

    /// `unload(to_cpu)`: 204/`Changed` if the state was `LOADED_ON_DEVICE`,
    /// 304/`Unchanged` otherwise.
    pub fn request_unload(&mut self, to_cpu: bool) -> TransitionOutcome {
        if self.state != LifecycleState::LoadedOnDevice {
            return TransitionOutcome::Unchanged;
        }
        self.state = if to_cpu && self.is_cuda {
            LifecycleState::UnloadedKeepingCpuCache
        } else {
            LifecycleState::Unloaded
        };
        TransitionOutcome::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_loaded() {
        let ctrl = LifecycleController::new(false);
        assert_eq!(ctrl.state(), LifecycleState::LoadedOnDevice);
    }

    #[test]
    fn test_unload_then_unload_is_idempotent() {
        let mut ctrl = LifecycleController::new(false);
        assert_eq!(ctrl.request_unload(false), TransitionOutcome::Changed);
        assert_eq!(ctrl.request_unload(false), TransitionOutcome::Unchanged);
    }

    #[test]
    fn test_load_then_load_is_idempotent() {
        let mut ctrl = LifecycleController::new(false);
        ctrl.request_unload(false);
        assert_eq!(ctrl.request_load(), TransitionOutcome::Changed);
        assert_eq!(ctrl.request_load(), TransitionOutcome::Unchanged);
    }

    #[test]
    fn test_to_cpu_ignored_on_cpu_device() {
        let mut ctrl = LifecycleController::new(false);
        ctrl.request_unload(true);
        assert_eq!(ctrl.state(), LifecycleState::Unloaded);
    }

    #[test]
    fn test_to_cpu_honored_on_cuda_device() {
        let mut ctrl = LifecycleController::new(true);
        ctrl.request_unload(true);
        assert_eq!(ctrl.state(), LifecycleState::UnloadedKeepingCpuCache);
    }

    #[test]
    fn test_to_cpu_false_on_cuda_fully_unloads() {
        let mut ctrl = LifecycleController::new(true);
        ctrl.request_unload(false);
        assert_eq!(ctrl.state(), LifecycleState::Unloaded);
    }

    #[test]
    fn test_reload_from_kept_cache_flags_reuse() {
        let mut ctrl = LifecycleController::new(true);
        ctrl.request_unload(true);
        assert!(ctrl.should_reuse_cpu_cache());
        ctrl.request_load();
        assert!(!ctrl.should_reuse_cpu_cache());
    }
}
