//! Resolution scopes - One arena per dispatch call

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

type CloseHook = Box<dyn FnOnce() + Send>;

/// Bounded lifetime context for the handler and behavior instances of one dispatch.
///
/// Scope-local resources created through `get_or_insert_with` are shared by
/// everything resolved within the scope and dropped when it closes. Dropping an
/// open scope closes it.
pub struct Scope {
    id: Uuid,
    opened_at: DateTime<Utc>,
    resources: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    hooks: Mutex<Vec<CloseHook>>,
    closed: AtomicBool,
}

impl Scope {
    pub fn new() -> Self {
        let scope = Self {
            id: Uuid::new_v4(),
            opened_at: Utc::now(),
            resources: Mutex::new(HashMap::new()),
            hooks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };
        tracing::trace!(scope = %scope.id, "scope opened");
        scope
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Scope-local instance of `T`, created on first use.
    ///
    /// `create` runs without the resource lock held, so it may pull other
    /// resources from the same scope. If two callers race, the first insert wins.
    pub fn get_or_insert_with<T, F>(&self, create: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.resource::<T>() {
            return existing;
        }

        let created = Arc::new(create());
        let mut resources = self.lock_resources();
        let raced = resources
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|existing| existing.downcast::<T>().ok());
        if let Some(existing) = raced {
            return existing;
        }
        resources.insert(TypeId::of::<T>(), created.clone());
        created
    }

    fn resource<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let existing = self.lock_resources().get(&TypeId::of::<T>()).cloned()?;
        existing.downcast::<T>().ok()
    }

    fn lock_resources(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, Arc<dyn Any + Send + Sync>>> {
        match self.resources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a release hook; hooks run in reverse order when the scope closes
    pub fn on_close<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() {
            hook();
            return;
        }
        match self.hooks.lock() {
            Ok(mut hooks) => hooks.push(Box::new(hook)),
            Err(poisoned) => poisoned.into_inner().push(Box::new(hook)),
        }
    }

    /// Release everything allocated in this scope.
    ///
    /// Returns `true` for the call that actually closed the scope; later calls are no-ops.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let hooks = match self.hooks.lock() {
            Ok(mut hooks) => std::mem::take(&mut *hooks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for hook in hooks.into_iter().rev() {
            hook();
        }

        self.lock_resources().clear();

        tracing::trace!(scope = %self.id, "scope closed");
        true
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("opened_at", &self.opened_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Opens one scope per dispatch
pub trait ScopeFactory: Send + Sync {
    fn create_scope(&self) -> Scope;
}

/// Plain scopes with no extra resources
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultScopeFactory;

impl ScopeFactory for DefaultScopeFactory {
    fn create_scope(&self) -> Scope {
        Scope::new()
    }
}

impl<F> ScopeFactory for F
where
    F: Fn() -> Scope + Send + Sync,
{
    fn create_scope(&self) -> Scope {
        self()
    }
}
