//! Preferences lifecycle against the in-memory key-value store
//!
//! Covers declaration, lazy loading, the text API, schema migration and the
//! partition recovery path of `Prefs::init`.

use flash_prefs::core::prefs::{
    FnHook, InitError, MigrationError, MigrationHook, NoMigration, PrefValue, Prefs, PrefsError,
    RegistryError, Status,
};
use flash_prefs::platform::error::KvError;
use flash_prefs::platform::mock::{Faults, MockKvStore};
use flash_prefs_core::name::VERSION_KEY;
use flash_prefs_core::Value;

use std::fmt::Debug;

fn app(mock: &MockKvStore, version: u32) -> Prefs<MockKvStore> {
    Prefs::new(mock.clone(), "App", version).unwrap()
}

/// Hook recording every `on_init` call
#[derive(Default)]
struct Recorder {
    calls: Vec<(u32, u32)>,
}

impl MigrationHook<MockKvStore> for Recorder {
    fn on_init(
        &mut self,
        _prefs: &Prefs<MockKvStore>,
        stored: u32,
        current: u32,
    ) -> Result<(), MigrationError> {
        self.calls.push((stored, current));
        Ok(())
    }
}

/// Hook that restores defaults whenever the versions differ
struct ResetOnMismatch {
    calls: u32,
}

impl MigrationHook<MockKvStore> for ResetOnMismatch {
    fn on_init(
        &mut self,
        prefs: &Prefs<MockKvStore>,
        stored: u32,
        current: u32,
    ) -> Result<(), MigrationError> {
        self.calls += 1;
        if stored != current {
            self.reset(prefs)?;
        }
        Ok(())
    }

    fn reset(&mut self, prefs: &Prefs<MockKvStore>) -> Result<(), MigrationError> {
        prefs.reset_all();
        Ok(())
    }
}

fn round_trip<T>(prefs: &Prefs<MockKvStore>, key: &str, default: T, value: T)
where
    T: PrefValue + PartialEq + Debug,
{
    let var = prefs.declare(key, default).unwrap();
    var.set(value.clone());
    assert_eq!(var.get(), value, "{key}");
}

#[test]
fn test_round_trip_every_type() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 1);
    prefs.init(&mut NoMigration).unwrap();

    round_trip(&prefs, "Bool", false, true);
    round_trip(&prefs, "U8", 0u8, u8::MAX);
    round_trip(&prefs, "I8", 0i8, i8::MIN);
    round_trip(&prefs, "U16", 0u16, 0xBEEF);
    round_trip(&prefs, "I16", 0i16, -1234);
    round_trip(&prefs, "U32", 0u32, 4_000_000_000);
    round_trip(&prefs, "I32", 0i32, -70_000);
    round_trip(&prefs, "U64", 0u64, u64::MAX);
    round_trip(&prefs, "I64", 0i64, i64::MIN);
    round_trip(&prefs, "Str", String::new(), String::from("rover-01"));

    assert_eq!(mock.committed("App", "U16"), Some(Value::U16(0xBEEF)));
    assert_eq!(mock.committed("App", "Bool"), Some(Value::I8(1)));
}

#[test]
fn test_round_trip_survives_write_failure() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 1);
    prefs.init(&mut NoMigration).unwrap();
    mock.inject(Faults::FAIL_WRITE);

    let volume = prefs.declare("Volume", 5u8).unwrap();
    assert_eq!(volume.set(9), 0);
    assert_eq!(volume.get(), 9);

    let name = prefs.declare("Name", String::from("a")).unwrap();
    assert_eq!(name.set(String::from("b")), 0);
    assert_eq!(name.get(), "b");
    assert_eq!(mock.committed("App", "Volume"), None);
}

#[test]
fn test_text_round_trip() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 1);
    let enabled = prefs.declare("Enabled", true).unwrap();
    let offset = prefs.declare("Offset", -42i32).unwrap();
    let label = prefs.declare("Label", String::from("front left")).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    for key in ["Enabled", "Offset", "Label"] {
        let text = prefs.get(key);
        prefs.set(key, &text);
        assert_eq!(prefs.get(key), text);
    }
    assert!(enabled.get());
    assert_eq!(offset.get(), -42);
    assert_eq!(label.get(), "front left");
}

#[test]
fn test_bool_parse_through_registry() {
    let prefs = app(&MockKvStore::new(), 1);
    let flag = prefs.declare("Flag", false).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    for text in ["true", "1", "True"] {
        flag.set(false);
        prefs.set("Flag", text);
        assert!(flag.get(), "{text}");
    }
    for text in ["TRUE", "yes", "", "0", "false"] {
        flag.set(true);
        prefs.set("Flag", text);
        assert!(!flag.get(), "{text}");
    }
}

#[test]
fn test_lazy_load_reads_backend_once() {
    let mock = MockKvStore::new();
    mock.insert("App", "Count", Value::U32(11));
    let prefs = app(&mock, 1);
    let count = prefs.declare("Count", 0u32).unwrap();

    // Closed: default, no backend access, nothing cached
    assert_eq!(count.get(), 0);
    assert!(!count.is_initialized());
    assert_eq!(mock.stats().reads, 0);

    prefs.init(&mut NoMigration).unwrap();
    mock.reset_stats();

    assert_eq!(count.get(), 11);
    assert_eq!(mock.stats().reads, 1);

    mock.insert("App", "Count", Value::U32(99));
    assert_eq!(count.get(), 11);
    assert_eq!(mock.stats().reads, 1);
}

#[test]
fn test_migration_runs_once_per_version() {
    let mock = MockKvStore::new();

    let mut first = Recorder::default();
    {
        let prefs = app(&mock, 3);
        prefs.init(&mut first).unwrap();
        assert_eq!(prefs.stored_version(), Some(0));
    }
    assert_eq!(first.calls, [(0, 3)]);
    assert_eq!(mock.committed("App", VERSION_KEY), Some(Value::U32(3)));

    mock.power_cycle();
    mock.reset_stats();

    let mut second = Recorder::default();
    let prefs = app(&mock, 3);
    prefs.init(&mut second).unwrap();
    assert_eq!(second.calls, [(3, 3)]);
    assert_eq!(prefs.stored_version(), Some(3));
    assert_eq!(mock.stats().writes, 0);
    assert_eq!(mock.stats().commits, 0);
}

#[test]
fn test_failed_migration_keeps_stored_version() {
    let mock = MockKvStore::new();
    mock.insert("App", VERSION_KEY, Value::U32(1));

    {
        let prefs = app(&mock, 2);
        let err = prefs
            .init(&mut FnHook(
                |_: &Prefs<MockKvStore>, from: u32, to: u32| -> Result<(), MigrationError> {
                    Err(MigrationError::Unsupported { from, to })
                },
            ))
            .unwrap_err();

        assert!(matches!(
            err,
            InitError::Migration {
                stored: 1,
                current: 2,
                ..
            }
        ));
        assert_eq!(prefs.status(), Status::Failed);
        assert_eq!(mock.open_handles(), 0);
    }

    mock.power_cycle();
    assert_eq!(mock.committed("App", VERSION_KEY), Some(Value::U32(1)));

    let prefs = app(&mock, 2);
    let mut recorder = Recorder::default();
    prefs.init(&mut recorder).unwrap();
    assert_eq!(recorder.calls, [(1, 2)]);
}

#[test]
fn test_hook_failure_on_matching_version() {
    let mock = MockKvStore::new();
    mock.insert("App", VERSION_KEY, Value::U32(4));
    let prefs = app(&mock, 4);

    let result = prefs.init(&mut FnHook(
        |_: &Prefs<MockKvStore>, _: u32, _: u32| -> Result<(), MigrationError> {
            Err(MigrationError::Aborted("sensor calibration missing"))
        },
    ));
    assert!(result.is_err());
    assert_eq!(prefs.status(), Status::Failed);
    assert!(prefs.last_error().is_some());
    assert_eq!(mock.committed("App", VERSION_KEY), Some(Value::U32(4)));
}

#[test]
fn test_hook_migrates_values() {
    let mock = MockKvStore::new();
    mock.insert("App", VERSION_KEY, Value::U32(1));
    mock.insert("App", "Legacy", Value::U8(3));

    let prefs = app(&mock, 2);
    let volume = prefs.declare("Volume", 5u8).unwrap();
    prefs
        .init(&mut FnHook(
            |p: &Prefs<MockKvStore>, stored: u32, _: u32| -> Result<(), MigrationError> {
                if stored < 2 {
                    p.try_set("Volume", "7")?;
                    p.erase_key("Legacy");
                }
                Ok(())
            },
        ))
        .unwrap();

    assert_eq!(volume.get(), 7);
    assert_eq!(mock.committed("App", "Volume"), Some(Value::U8(7)));
    assert_eq!(mock.committed("App", "Legacy"), None);
}

#[test]
fn test_hook_unknown_key_fails_init() {
    let prefs = app(&MockKvStore::new(), 2);
    let err = prefs
        .init(&mut FnHook(
            |p: &Prefs<MockKvStore>, _: u32, _: u32| -> Result<(), MigrationError> {
                p.try_set("Missing", "1")?;
                Ok(())
            },
        ))
        .unwrap_err();

    assert!(matches!(
        err,
        InitError::Migration {
            source: MigrationError::Registry(RegistryError::NotFound(_)),
            ..
        }
    ));
}

#[test]
fn test_lookup_by_key() {
    let prefs = app(&MockKvStore::new(), 1);
    let port = prefs.declare("Port", 80u16).unwrap();
    let name = prefs.declare("Name", String::from("rover")).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    assert_eq!(prefs.set("unknown_key", "5"), 0);
    assert_eq!(prefs.get("unknown_key"), "");
    assert_eq!(port.get(), 80);
    assert_eq!(name.get(), "rover");

    assert_eq!(prefs.set("Port", "5"), 1);
    assert_eq!(prefs.get("Port"), "5");
    assert_eq!(
        prefs.try_get("unknown_key"),
        Err(RegistryError::NotFound(String::from("unknown_key")))
    );
}

#[test]
fn test_get_into_does_not_overflow() {
    let prefs = app(&MockKvStore::new(), 1);
    prefs.declare("Name", String::from("rover")).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    let mut buf = [0xEEu8; 8];
    assert!(!prefs.get_into("Name", &mut buf[..3]));
    assert_eq!(buf, [0xEE; 8]);

    assert!(!prefs.get_into("Name", &mut buf[..5]));
    assert_eq!(buf, [0xEE; 8]);

    assert!(prefs.get_into("Name", &mut buf[..6]));
    assert_eq!(&buf, b"rover\0\xEE\xEE");
}

#[test]
fn test_fresh_namespace_reset_scenario() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 2);
    let name = prefs.declare("DeviceName", String::from("rover")).unwrap();
    let volume = prefs.declare("Volume", 5u8).unwrap();
    let enabled = prefs.declare("Enabled", true).unwrap();

    let mut hook = ResetOnMismatch { calls: 0 };
    prefs.init(&mut hook).unwrap();

    assert_eq!(hook.calls, 1);
    assert_eq!(prefs.stored_version(), Some(0));
    assert!(prefs.status().is_ready());
    assert_eq!(mock.committed("App", VERSION_KEY), Some(Value::U32(2)));
    assert_eq!(
        mock.committed("App", "DeviceName"),
        Some(Value::Str(String::from("rover")))
    );
    assert_eq!(mock.committed("App", "Volume"), Some(Value::U8(5)));
    assert_eq!(mock.committed("App", "Enabled"), Some(Value::I8(1)));
    assert_eq!(name.get(), "rover");
    assert_eq!(volume.get(), 5);
    assert!(enabled.get());
}

#[test]
fn test_default_commits_every_write() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 1);
    let a = prefs.declare("A", 1u8).unwrap();
    let b = prefs.declare("B", 2u8).unwrap();
    prefs.init(&mut NoMigration).unwrap();
    mock.reset_stats();

    a.set(10);
    b.set(20);
    assert_eq!(mock.stats().commits, 2);
}

#[test]
fn test_batch_commits_once() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 1);
    let a = prefs.declare("A", 1u8).unwrap();
    let b = prefs.declare("B", 2u16).unwrap();
    let c = prefs.declare("C", String::from("x")).unwrap();
    prefs.init(&mut NoMigration).unwrap();
    mock.reset_stats();

    {
        let _batch = prefs.batch();
        a.set(10);
        b.set(20);
        c.set(String::from("y"));
        assert_eq!(mock.stats().commits, 0);
        assert_eq!(mock.current("App", "B"), Some(Value::U16(20)));
        assert_eq!(mock.committed("App", "B"), None);
    }

    assert_eq!(mock.stats().writes, 3);
    assert_eq!(mock.stats().commits, 1);
    assert_eq!(mock.committed("App", "C"), Some(Value::Str(String::from("y"))));
}

#[test]
fn test_declare_rejects_duplicate_and_reserved() {
    let prefs = app(&MockKvStore::new(), 1);
    prefs.declare("Volume", 1u8).unwrap();

    assert_eq!(
        prefs.declare("Volume", 2u32).unwrap_err(),
        PrefsError::DuplicateKey(String::from("Volume"))
    );
    assert_eq!(
        prefs.declare(VERSION_KEY, 0u32).unwrap_err(),
        PrefsError::ReservedKey(String::from(VERSION_KEY))
    );
    assert!(matches!(
        prefs.declare("", 0u8),
        Err(PrefsError::InvalidKey { .. })
    ));
}

#[test]
fn test_partition_erased_and_retried() {
    for error in [KvError::NoFreePages, KvError::NewVersionFound] {
        let mock = MockKvStore::new();
        mock.insert("App", "Stale", Value::U8(1));
        mock.fail_next_init(error);

        let prefs = app(&mock, 1);
        prefs.init(&mut NoMigration).unwrap();

        assert!(prefs.status().is_ready());
        assert_eq!(mock.stats().erases, 1);
        assert_eq!(mock.stats().inits, 2);
        assert_eq!(mock.committed("App", "Stale"), None);
    }
}

#[test]
fn test_partition_retry_fails_once_more() {
    let mock = MockKvStore::new();
    mock.fail_next_init(KvError::NoFreePages);
    mock.fail_next_init(KvError::NoFreePages);

    let prefs = app(&mock, 1);
    let err = prefs.init(&mut NoMigration).unwrap_err();

    assert_eq!(
        err,
        InitError::Partition {
            partition: String::from("nvs"),
            error: KvError::NoFreePages,
        }
    );
    assert_eq!(prefs.status(), Status::Failed);
    assert_eq!(mock.stats().erases, 1);
}

#[test]
fn test_end_and_reinit() {
    let mock = MockKvStore::new();
    let prefs = app(&mock, 1);
    let volume = prefs.declare("Volume", 5u8).unwrap();

    prefs.init(&mut NoMigration).unwrap();
    volume.set(8);
    prefs.end();
    assert_eq!(prefs.status(), Status::Closed);
    assert_eq!(mock.open_handles(), 0);

    // Closed: writes report 0 but the cache still follows
    assert_eq!(volume.set(9), 0);
    assert_eq!(volume.get(), 9);

    prefs.init(&mut NoMigration).unwrap();
    assert_eq!(prefs.status(), Status::Ready);
    assert_eq!(mock.committed("App", "Volume"), Some(Value::U8(8)));
}

#[test]
fn test_namespaces_are_isolated() {
    let mock = MockKvStore::new();
    let first = Prefs::new(mock.clone(), "First", 1).unwrap();
    let second = Prefs::new(mock.clone(), "Second", 1).unwrap();
    let a = first.declare("Value", 1u32).unwrap();
    let b = second.declare("Value", 2u32).unwrap();

    first.init(&mut NoMigration).unwrap();
    second.init(&mut NoMigration).unwrap();
    a.set(100);

    assert_eq!(b.get(), 2);
    assert_eq!(mock.committed("First", "Value"), Some(Value::U32(100)));
    assert_eq!(mock.committed("Second", "Value"), None);
}
