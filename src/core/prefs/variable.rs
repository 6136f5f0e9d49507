//! Typed preference variables
//!
//! A [`Variable<T>`] owns a key, a compiled-in default and a lazily loaded
//! cache of the stored value. Backend access goes through the getter and
//! setter closures bound at declaration time. Every variable also exposes the
//! type-erased [`TextVariable`] capability used by the registry's string API.

use crate::core::prefs::adapter::KvAdapter;
use crate::platform::traits::KvStore;
use alloc::boxed::Box;
use alloc::string::String;
use core::cell::{Cell, RefCell};
use flash_prefs_core::codec::{FromText, ToText};
use flash_prefs_core::name::Key;
use flash_prefs_core::value::ValueKind;

/// Value types a preference variable can hold
///
/// Each type knows its stored kind and how to move through a [`KvAdapter`].
pub trait PrefValue: Clone + FromText + ToText + 'static {
    /// Stored kind
    const KIND: ValueKind;

    /// Read from the backend, `default` on any error
    fn load<S: KvStore>(adapter: &KvAdapter<S>, key: &str, default: &Self) -> Self;

    /// Write to the backend; bytes reported by the adapter, 0 on failure
    fn store<S: KvStore>(adapter: &KvAdapter<S>, key: &str, value: &Self) -> usize;
}

impl PrefValue for bool {
    const KIND: ValueKind = ValueKind::I8;

    fn load<S: KvStore>(adapter: &KvAdapter<S>, key: &str, default: &Self) -> Self {
        adapter.get_bool(key, *default)
    }

    fn store<S: KvStore>(adapter: &KvAdapter<S>, key: &str, value: &Self) -> usize {
        adapter.put_bool(key, *value)
    }
}

impl PrefValue for String {
    const KIND: ValueKind = ValueKind::Str;

    fn load<S: KvStore>(adapter: &KvAdapter<S>, key: &str, default: &Self) -> Self {
        adapter.get_string(key, default)
    }

    fn store<S: KvStore>(adapter: &KvAdapter<S>, key: &str, value: &Self) -> usize {
        adapter.put_string(key, value)
    }
}

macro_rules! impl_pref_value_scalar {
    ($($t:ty),*) => {
        $(
            impl PrefValue for $t {
                const KIND: ValueKind = <$t as flash_prefs_core::value::Scalar>::KIND;

                fn load<S: KvStore>(adapter: &KvAdapter<S>, key: &str, default: &Self) -> Self {
                    adapter.get_scalar(key, *default)
                }

                fn store<S: KvStore>(adapter: &KvAdapter<S>, key: &str, value: &Self) -> usize {
                    adapter.put_scalar(key, *value)
                }
            }
        )*
    };
}

impl_pref_value_scalar!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Reads `(key, default)`; `None` when the backend is not open
pub type Getter<T> = Box<dyn Fn(&str, &T) -> Option<T>>;

/// Writes `(key, value)`; bytes written or 0
pub type Setter<T> = Box<dyn Fn(&str, &T) -> usize>;

/// Type-erased string capability of a variable
pub trait TextVariable {
    /// Variable key
    fn key(&self) -> &str;

    /// Stored kind
    fn kind(&self) -> ValueKind;

    /// Parse `text` and store it; setter result
    fn from_text(&self, text: &str) -> usize;

    /// Render the current value
    fn to_text(&self) -> String;

    /// Render the current value into `buf` as NUL-terminated bytes
    fn copy_to_buffer(&self, buf: &mut [u8]) -> bool;

    /// Persist the default value
    fn set_default(&self) -> usize;

    /// Whether the cache holds a loaded or written value
    fn is_initialized(&self) -> bool;
}

/// Strongly-typed preference variable
///
/// # Example
///
/// ```
/// use flash_prefs::core::prefs::Variable;
/// use flash_prefs_core::name::bounded_name;
///
/// let var = Variable::new(
///     bounded_name("Volume").unwrap(),
///     5u8,
///     |_, _| Some(9),
///     |_, _| 1,
/// );
/// assert_eq!(var.get(), 9);
/// assert_eq!(var.set(3), 1);
/// assert_eq!(var.get(), 3);
/// ```
pub struct Variable<T: PrefValue> {
    key: Key,
    default: T,
    current: RefCell<T>,
    initialized: Cell<bool>,
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T: PrefValue> Variable<T> {
    pub fn new(
        key: Key,
        default: T,
        getter: impl Fn(&str, &T) -> Option<T> + 'static,
        setter: impl Fn(&str, &T) -> usize + 'static,
    ) -> Self {
        Self {
            key,
            current: RefCell::new(default.clone()),
            default,
            initialized: Cell::new(false),
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }

    /// Variable key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Compiled-in default
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Whether the cache holds a loaded or written value
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    fn ensure_loaded(&self) {
        if self.initialized.get() {
            return;
        }
        if let Some(value) = (self.getter)(&self.key, &self.default) {
            *self.current.borrow_mut() = value;
            self.initialized.set(true);
        }
    }

    /// Current value
    ///
    /// The first call with the backend open reads it once; later calls are
    /// served from the cache. While the backend is closed the default is
    /// returned and nothing is cached.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Borrow the current value without cloning
    ///
    /// # Panics
    ///
    /// If `f` writes to this same variable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.ensure_loaded();
        f(&self.current.borrow())
    }

    /// Persist `value` and update the cache
    ///
    /// The cache is updated even when the backend write fails; the return
    /// value is the setter's byte count (0 on failure).
    pub fn set(&self, value: T) -> usize {
        let written = (self.setter)(&self.key, &value);
        *self.current.borrow_mut() = value;
        self.initialized.set(true);
        written
    }

    /// Persist the default and reset the cache to it
    pub fn set_default(&self) -> usize {
        self.set(self.default.clone())
    }

    /// Parse `text` and store it
    pub fn from_text(&self, text: &str) -> usize {
        self.set(T::from_text(text))
    }

    /// Render the current value
    pub fn to_text(&self) -> String {
        self.with(T::to_text)
    }

    /// Render into `buf` as NUL-terminated bytes
    ///
    /// Fails, leaving `buf` untouched, unless the text plus terminator fits.
    pub fn copy_to_buffer(&self, buf: &mut [u8]) -> bool {
        let text = self.to_text();
        let len = text.len();
        if len + 1 > buf.len() {
            return false;
        }
        buf[..len].copy_from_slice(text.as_bytes());
        buf[len] = 0;
        true
    }
}

impl<T: PrefValue> TextVariable for Variable<T> {
    fn key(&self) -> &str {
        Variable::key(self)
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }

    fn from_text(&self, text: &str) -> usize {
        Variable::from_text(self, text)
    }

    fn to_text(&self) -> String {
        Variable::to_text(self)
    }

    fn copy_to_buffer(&self, buf: &mut [u8]) -> bool {
        Variable::copy_to_buffer(self, buf)
    }

    fn set_default(&self) -> usize {
        Variable::set_default(self)
    }

    fn is_initialized(&self) -> bool {
        Variable::is_initialized(self)
    }
}

impl<T: PrefValue + core::fmt::Debug> core::fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Variable")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("current", &self.current)
            .field("initialized", &self.initialized)
            .finish()
    }
}
