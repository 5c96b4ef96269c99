use crate::hooks::{FireEvent, LifecycleObserver};

///
/// SaveOptions
///
/// Per-call switches for `save_changes`, `insert`, and `update`.
///

pub struct SaveOptions<'a, E> {
    /// Leave identity and computed columns out of inserts.
    pub ignore_automatic: bool,
    pub fire: FireEvent,

    /// Make `save_changes` a no-op when the row already exists.
    pub do_not_update_when_exists: bool,
    pub validate: bool,
    pub observer: Option<&'a dyn LifecycleObserver<E>>,
}

impl<E> Default for SaveOptions<'_, E> {
    fn default() -> Self {
        Self {
            ignore_automatic: true,
            fire: FireEvent::default(),
            do_not_update_when_exists: false,
            validate: false,
            observer: None,
        }
    }
}

impl<'a, E> SaveOptions<'a, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn ignore_automatic(mut self, ignore: bool) -> Self {
        self.ignore_automatic = ignore;
        self
    }

    #[must_use]
    pub const fn fire(mut self, fire: FireEvent) -> Self {
        self.fire = fire;
        self
    }

    #[must_use]
    pub const fn do_not_update_when_exists(mut self) -> Self {
        self.do_not_update_when_exists = true;
        self
    }

    #[must_use]
    pub const fn validate(mut self) -> Self {
        self.validate = true;
        self
    }

    #[must_use]
    pub const fn observer(mut self, observer: &'a dyn LifecycleObserver<E>) -> Self {
        self.observer = Some(observer);
        self
    }
}

///
/// DeleteOptions
///

pub struct DeleteOptions<'a, E> {
    pub fire_before: bool,
    pub fire_after: bool,
    pub observer: Option<&'a dyn LifecycleObserver<E>>,
}

impl<E> Default for DeleteOptions<'_, E> {
    fn default() -> Self {
        Self {
            fire_before: true,
            fire_after: true,
            observer: None,
        }
    }
}

impl<'a, E> DeleteOptions<'a, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.fire_before = false;
        self.fire_after = false;
        self
    }

    #[must_use]
    pub const fn observer(mut self, observer: &'a dyn LifecycleObserver<E>) -> Self {
        self.observer = Some(observer);
        self
    }
}
