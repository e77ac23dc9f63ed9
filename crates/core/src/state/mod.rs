use std::{
    cell::RefCell,
    fmt,
    path::Path,
    rc::{Rc, Weak},
};

use serde::{Deserialize, Serialize};

use crate::{
    color::{HighlightColor, Theme},
    Result,
};

type Listener<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Shared value with change notification.
///
/// Clones share the same underlying cell.
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Stores `value` and notifies listeners. Returns `false` (and notifies
    /// nobody) when the value is unchanged.
    pub fn set(&self, value: T) -> bool {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value.clone();
            inner
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect::<Vec<_>>()
        };

        for listener in listeners {
            listener(&value);
        }
        true
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    /// Registers `callback` for every subsequent change. The returned guard
    /// unsubscribes when dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::new(callback)));
            id
        };

        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .borrow_mut()
                        .listeners
                        .retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

/// Guard returned by [`Observable::subscribe`].
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The two externally owned presentation attributes.
#[derive(Debug, Clone)]
pub struct ThemeState {
    pub theme: Observable<Theme>,
    pub highlight: Observable<Option<HighlightColor>>,
}

impl ThemeState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme: Observable::new(theme),
            highlight: Observable::new(None),
        }
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme.get().toggled();
        self.theme.set(next);
        next
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new(Theme::Dark)
    }
}

pub const DEFAULT_MASTER_VOLUME: f32 = 0.3;

/// Persisted audio preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub enabled: bool,
    pub master_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

impl AudioSettings {
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.master_volume = clamp_volume(volume);
        self
    }

    /// Reads settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let settings: AudioSettings = serde_json::from_str(&raw)?;
                Ok(settings.with_volume(settings.master_volume))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

/// Global audio state read by every sound trigger.
#[derive(Debug, Clone)]
pub struct AudioState {
    settings: Observable<AudioSettings>,
}

impl AudioState {
    pub fn new(settings: AudioSettings) -> Self {
        Self {
            settings: Observable::new(settings.with_volume(settings.master_volume)),
        }
    }

    pub fn settings(&self) -> AudioSettings {
        self.settings.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.get().enabled
    }

    pub fn master_volume(&self) -> f32 {
        self.settings.get().master_volume
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.settings.update(|settings| settings.enabled = enabled);
    }

    pub fn set_volume(&self, volume: f32) {
        self.settings
            .update(|settings| settings.master_volume = clamp_volume(volume));
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&AudioSettings) + 'static) -> Subscription {
        self.settings.subscribe(callback)
    }
}

impl Default for AudioState {
    fn default() -> Self {
        Self::new(AudioSettings::default())
    }
}
