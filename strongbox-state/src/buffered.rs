//! Write-ahead buffer that rolls a value over into another state store once a
//! dependency allows it.
//!
//! Typical use is migrating a legacy plaintext value into encrypted storage:
//! the legacy value is buffered, and once the user's key is available it is
//! validated, mapped and written to the encrypted output exactly once.

use crate::error::StateResult;
use crate::key_definition::{ClearEvent, StateLocation, StateValue, UserKeyDefinition};
use crate::provider::{ActiveState, StateProvider, UpdateOptions, UserState};
use crate::stream::StateStream;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use strongbox_types::UserId;
use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Truthiness used by the default overwrite rule.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

type Validator<I, D> = Arc<dyn Fn(&I, &D) -> bool + Send + Sync>;
type Mapper<I, O, D> = Arc<dyn Fn(I, &D) -> O + Send + Sync>;
type OverwriteRule<D> = Arc<dyn Fn(&D) -> bool + Send + Sync>;

/// Where a buffered value is kept and how it is rolled over.
///
/// Defaults: every buffered value is valid, the value is passed through
/// unchanged, and the overwrite fires whenever the dependency is truthy.
pub struct BufferedKeyDefinition<I, O = I, D = bool> {
    location: StateLocation,
    key: String,
    clear_on: Vec<ClearEvent>,
    is_valid: Validator<I, D>,
    map: Mapper<I, O, D>,
    should_overwrite: OverwriteRule<D>,
}

impl<T: StateValue, D: Truthy + 'static> BufferedKeyDefinition<T, T, D> {
    pub fn new(location: StateLocation, key: impl Into<String>) -> Self {
        Self {
            location,
            key: key.into(),
            clear_on: Vec::new(),
            is_valid: Arc::new(|_: &T, _: &D| true),
            map: Arc::new(|value: T, _: &D| value),
            should_overwrite: Arc::new(|dependency: &D| dependency.is_truthy()),
        }
    }
}

impl<I, O, D> BufferedKeyDefinition<I, O, D> {
    pub fn with_clear_on(mut self, events: &[ClearEvent]) -> Self {
        self.clear_on = events.to_vec();
        self
    }

    pub fn with_is_valid(mut self, f: impl Fn(&I, &D) -> bool + Send + Sync + 'static) -> Self {
        self.is_valid = Arc::new(f);
        self
    }

    pub fn with_should_overwrite(mut self, f: impl Fn(&D) -> bool + Send + Sync + 'static) -> Self {
        self.should_overwrite = Arc::new(f);
        self
    }

    /// Replaces the transformation applied before the output write.
    pub fn with_map<P>(
        self,
        f: impl Fn(I, &D) -> P + Send + Sync + 'static,
    ) -> BufferedKeyDefinition<I, P, D> {
        BufferedKeyDefinition {
            location: self.location,
            key: self.key,
            clear_on: self.clear_on,
            is_valid: self.is_valid,
            map: Arc::new(f),
            should_overwrite: self.should_overwrite,
        }
    }

    pub fn is_valid(&self, value: &I, dependency: &D) -> bool {
        (self.is_valid)(value, dependency)
    }

    pub fn map(&self, value: I, dependency: &D) -> O {
        (self.map)(value, dependency)
    }

    pub fn should_overwrite(&self, dependency: &D) -> bool {
        (self.should_overwrite)(dependency)
    }
}

impl<I: StateValue, O, D> BufferedKeyDefinition<I, O, D> {
    /// Definition of the key the buffered value itself is stored under.
    pub fn to_key_definition(&self) -> UserKeyDefinition<I> {
        UserKeyDefinition::new(self.location, self.key.clone(), &self.clear_on)
    }
}

struct Shared<I, O, D, S> {
    provider: Arc<StateProvider>,
    definition: BufferedKeyDefinition<I, O, D>,
    output: S,
    buffer: UserState<I>,
    dependency: watch::Receiver<D>,
    /// Held across a rollover and across any write that must land after it.
    gate: AsyncMutex<()>,
    /// Signalled whenever a caller stages a new value.
    staged: Notify,
}

/// Output state fronted by a rollover buffer.
///
/// Reads and updates go to the output. A single background task per
/// instance moves buffered values into the output; the buffer is read and
/// cleared in one atomic step so a value is applied at most once. Updates
/// promote a pending buffered value first, so a write is never replaced by a
/// rollover that finishes after it.
///
/// When the output rejects a rollover, the value goes back into the buffer
/// and the task waits for the dependency to change or for a new value to be
/// staged before trying again.
pub struct BufferedState<I, O, D, S> {
    shared: Arc<Shared<I, O, D, S>>,
    rollover: Mutex<Option<JoinHandle<()>>>,
    _always: Option<watch::Sender<D>>,
}

impl<I, O, S> BufferedState<I, O, bool, S>
where
    I: StateValue,
    O: StateValue,
    S: ActiveState<O> + 'static,
{
    /// Buffer whose rollover is never held back by a dependency.
    pub fn new(
        provider: &Arc<StateProvider>,
        definition: BufferedKeyDefinition<I, O, bool>,
        output: S,
    ) -> Self {
        let (always, dependency) = watch::channel(true);
        let mut state = Self::with_dependency(provider, definition, output, dependency);
        state._always = Some(always);
        state
    }
}

impl<I, O, D, S> BufferedState<I, O, D, S>
where
    I: StateValue,
    O: StateValue,
    D: Clone + Send + Sync + 'static,
    S: ActiveState<O> + 'static,
{
    pub fn with_dependency(
        provider: &Arc<StateProvider>,
        definition: BufferedKeyDefinition<I, O, D>,
        output: S,
        dependency: watch::Receiver<D>,
    ) -> Self {
        let buffer = provider.get_user(output.user_id(), &definition.to_key_definition());
        Self {
            shared: Arc::new(Shared {
                provider: Arc::clone(provider),
                definition,
                output,
                buffer,
                dependency,
                gate: AsyncMutex::new(()),
                staged: Notify::new(),
            }),
            rollover: Mutex::new(None),
            _always: None,
        }
    }

    pub fn output(&self) -> &S {
        &self.shared.output
    }

    /// Stores `value` for a later rollover. `None` is ignored.
    pub async fn buffer(&self, value: Option<I>) -> StateResult<()> {
        let Some(value) = value else {
            return Ok(());
        };
        let shared = &self.shared;
        shared
            .provider
            .set_user_state(
                shared.output.user_id(),
                shared.buffer.definition(),
                Some(value),
            )
            .await?;
        shared.staged.notify_one();
        self.ensure_rollover();
        Ok(())
    }

    /// Attempts one rollover now and reports whether the output was written.
    pub async fn rollover_now(&self) -> StateResult<bool> {
        roll_over(&self.shared).await
    }

    fn ensure_rollover(&self) {
        let mut task = self
            .rollover
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        *task = Some(tokio::spawn(run_rollover(Arc::clone(&self.shared))));
    }
}

impl<I, O, D, S> Drop for BufferedState<I, O, D, S> {
    fn drop(&mut self) {
        let task = self
            .rollover
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

#[async_trait]
impl<I, O, D, S> ActiveState<O> for BufferedState<I, O, D, S>
where
    I: StateValue,
    O: StateValue,
    D: Clone + Send + Sync + 'static,
    S: ActiveState<O> + 'static,
{
    fn user_id(&self) -> &UserId {
        self.shared.output.user_id()
    }

    fn state(&self) -> StateStream<O> {
        self.ensure_rollover();
        self.shared.output.state()
    }

    async fn update_with<C, F>(&self, f: F, options: UpdateOptions<O, C>) -> StateResult<Option<O>>
    where
        C: Clone + Send + Sync + 'static,
        F: FnOnce(Option<O>, Option<&C>) -> Option<O> + Send + 'static,
    {
        let shared = &self.shared;
        let _gate = shared.gate.lock().await;
        promote(shared).await?;
        shared.output.update_with(f, options).await
    }
}

async fn run_rollover<I, O, D, S>(shared: Arc<Shared<I, O, D, S>>)
where
    I: StateValue,
    O: StateValue,
    D: Clone + Send + Sync + 'static,
    S: ActiveState<O> + 'static,
{
    let mut dependency = shared.dependency.clone();
    let mut buffer = shared.buffer.state();
    let mut dependency_open = true;
    // Set after a failed write; the restored buffer alone does not retry.
    let mut held = false;

    loop {
        tokio::select! {
            changed = dependency.changed(), if dependency_open => {
                if changed.is_err() {
                    dependency_open = false;
                    continue;
                }
            }
            () = shared.staged.notified() => {}
            next = buffer.next() => match next {
                None => break,
                Some(Ok(None)) => continue,
                Some(Ok(Some(_))) if held => continue,
                Some(Ok(Some(_))) => {}
                Some(Err(e)) => {
                    warn!("unreadable buffered value: {}", e);
                    continue;
                }
            }
        }

        held = match roll_over(&shared).await {
            Ok(_) => false,
            Err(e) => {
                warn!(
                    "rollover of {} failed, waiting for dependency: {}",
                    shared.buffer.definition().storage_key(),
                    e
                );
                true
            }
        };
    }
}

async fn roll_over<I, O, D, S>(shared: &Shared<I, O, D, S>) -> StateResult<bool>
where
    I: StateValue,
    O: StateValue,
    D: Clone + Send + Sync + 'static,
    S: ActiveState<O> + 'static,
{
    let _gate = shared.gate.lock().await;
    promote(shared).await
}

/// Moves the buffered value into the output. Callers hold `gate`.
async fn promote<I, O, D, S>(shared: &Shared<I, O, D, S>) -> StateResult<bool>
where
    I: StateValue,
    O: StateValue,
    D: Clone + Send + Sync + 'static,
    S: ActiveState<O> + 'static,
{
    let dependency = shared.dependency.borrow().clone();
    if !shared.definition.should_overwrite(&dependency) {
        return Ok(false);
    }

    let user_id = shared.output.user_id();
    let key = shared.buffer.definition().storage_key();
    let Some(raw) = shared.provider.take(user_id, &key).await? else {
        return Ok(false);
    };

    let buffered = match shared.buffer.definition().deserialize(raw.clone()) {
        Ok(value) => value,
        Err(e) => {
            warn!("discarding undecodable buffered value at {}: {}", key, e);
            return Ok(false);
        }
    };
    if !shared.definition.is_valid(&buffered, &dependency) {
        debug!("discarding invalid buffered value at {}", key);
        return Ok(false);
    }

    let mapped = shared.definition.map(buffered, &dependency);
    if let Err(e) = shared.output.update(move |_| Some(mapped)).await {
        if shared.provider.restore_if_empty(user_id, &key, raw).await? {
            debug!("restored buffered value at {} after failed write", key);
        }
        return Err(e);
    }
    debug!("rolled buffered value at {} into output", key);
    Ok(true)
}
