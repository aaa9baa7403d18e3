use crate::app::App;
use crate::engine::ContainerEngine;
use crate::RuntimeError;
use std::collections::BTreeMap;
use std::fmt;

pub const POST_START: &str = "post-start";

pub type Handler =
    Box<dyn Fn(&App, &dyn ContainerEngine) -> Result<(), RuntimeError> + Send + Sync>;

/// Lifecycle hooks registered on an app, run in ascending priority.
#[derive(Default)]
pub struct AppEvents {
    handlers: BTreeMap<String, Vec<(i32, Handler)>>,
}

impl AppEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, event: &str, priority: i32, handler: F)
    where
        F: Fn(&App, &dyn ContainerEngine) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        let handler: Handler = Box::new(handler);
        let list = self.handlers.entry(event.to_owned()).or_default();
        // Stable insert keeps registration order among equal priorities.
        let pos = list.partition_point(|(p, _)| *p <= priority);
        list.insert(pos, (priority, handler));
    }

    pub fn count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn emit(
        &self,
        event: &str,
        app: &App,
        engine: &dyn ContainerEngine,
    ) -> Result<(), RuntimeError> {
        let Some(list) = self.handlers.get(event) else {
            return Ok(());
        };
        tracing::debug!("emitting {event} to {} handler(s)", list.len());
        for (_, handler) in list {
            handler(app, engine)?;
        }
        Ok(())
    }
}

impl fmt::Debug for AppEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("AppEvents").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppDefinition;
    use crate::mock::MockEngine;
    use std::sync::{Arc, Mutex};

    #[test]
    fn handlers_run_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        AppDefinition::sample("order").write(dir.path()).unwrap();
        let app = App::load(dir.path()).unwrap();
        let engine = MockEngine::new();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut events = AppEvents::new();
        for (priority, label) in [(5, "late"), (1, "early"), (5, "late-second")] {
            let seen = Arc::clone(&seen);
            events.on(POST_START, priority, move |_, _| {
                seen.lock().unwrap().push(label);
                Ok(())
            });
        }

        assert_eq!(events.count(POST_START), 3);
        events.emit(POST_START, &app, &engine).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["early", "late", "late-second"]);
    }

    #[test]
    fn emitting_unknown_event_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        AppDefinition::sample("noop").write(dir.path()).unwrap();
        let app = App::load(dir.path()).unwrap();
        let events = AppEvents::new();
        events.emit("pre-stop", &app, &MockEngine::new()).unwrap();
    }

    #[test]
    fn handler_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        AppDefinition::sample("err").write(dir.path()).unwrap();
        let app = App::load(dir.path()).unwrap();
        let mut events = AppEvents::new();
        events.on(POST_START, 0, |_, _| Err(RuntimeError::ExecFailed("boom".to_owned())));
        assert!(events.emit(POST_START, &app, &MockEngine::new()).is_err());
    }
}
