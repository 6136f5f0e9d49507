//! Reference flash key-value store over the flash simulation
//!
//! Remounts are simulated by building a new store on a clone of the flash
//! image, the same way a reboot finds the chip.

use flash_prefs::core::nvs::{FlashKvStore, DEFAULT_PARTITIONS};
use flash_prefs::core::prefs::{NoMigration, Prefs, ResetOnFirstBoot, Status};
use flash_prefs::platform::error::KvError;
use flash_prefs::platform::mock::{MockFlash, BLOCK_SIZE};
use flash_prefs::platform::traits::{FlashInterface, KvHandle, KvStore, OpenMode};
use flash_prefs_core::block::{BlockHeader, FORMAT_VERSION};
use flash_prefs_core::value::MAX_STR_LEN;

const NVS_BASE: u32 = DEFAULT_PARTITIONS[0].base;

fn block_address(block: u32) -> u32 {
    NVS_BASE + block * BLOCK_SIZE
}

fn mount(flash: MockFlash) -> (FlashKvStore<MockFlash>, KvHandle) {
    let mut store = FlashKvStore::new(flash);
    store.init_partition("nvs").unwrap();
    let handle = store.open("nvs", "app", OpenMode::ReadWrite).unwrap();
    (store, handle)
}

fn remount(store: &FlashKvStore<MockFlash>) -> (FlashKvStore<MockFlash>, KvHandle) {
    mount(store.flash().clone())
}

#[test]
fn test_remount_round_trips_every_kind() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set::<u8>(handle, "U8", 0xAB).unwrap();
    store.set::<i8>(handle, "I8", -1).unwrap();
    store.set::<u16>(handle, "U16", 0xBEEF).unwrap();
    store.set::<i16>(handle, "I16", i16::MIN).unwrap();
    store.set::<u32>(handle, "U32", 0xDEAD_BEEF).unwrap();
    store.set::<i32>(handle, "I32", -123_456).unwrap();
    store.set::<u64>(handle, "U64", u64::MAX).unwrap();
    store.set::<i64>(handle, "I64", i64::MIN).unwrap();
    store.set_str(handle, "Str", "rover-01").unwrap();
    store.set_str(handle, "Empty", "").unwrap();
    store.commit(handle).unwrap();

    let (mut store, handle) = remount(&store);
    assert_eq!(store.get::<u8>(handle, "U8"), Ok(0xAB));
    assert_eq!(store.get::<i8>(handle, "I8"), Ok(-1));
    assert_eq!(store.get::<u16>(handle, "U16"), Ok(0xBEEF));
    assert_eq!(store.get::<i16>(handle, "I16"), Ok(i16::MIN));
    assert_eq!(store.get::<u32>(handle, "U32"), Ok(0xDEAD_BEEF));
    assert_eq!(store.get::<i32>(handle, "I32"), Ok(-123_456));
    assert_eq!(store.get::<u64>(handle, "U64"), Ok(u64::MAX));
    assert_eq!(store.get::<i64>(handle, "I64"), Ok(i64::MIN));

    let mut buf = [0u8; 16];
    assert_eq!(store.str_len(handle, "Str"), Ok(9));
    assert_eq!(store.get_str(handle, "Str", &mut buf), Ok(9));
    assert_eq!(&buf[..9], b"rover-01\0");
    assert_eq!(store.str_len(handle, "Empty"), Ok(1));
}

#[test]
fn test_kind_is_part_of_the_entry() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set::<u16>(handle, "Port", 80).unwrap();
    store.commit(handle).unwrap();

    let (mut store, handle) = remount(&store);
    assert_eq!(store.get::<u32>(handle, "Port"), Err(KvError::TypeMismatch));
    assert_eq!(store.get::<u16>(handle, "Port"), Ok(80));
}

#[test]
fn test_uncommitted_writes_are_lost() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set::<u32>(handle, "Kept", 1).unwrap();
    store.commit(handle).unwrap();
    store.set::<u32>(handle, "Lost", 2).unwrap();
    store.set::<u32>(handle, "Kept", 3).unwrap();

    let (mut store, handle) = remount(&store);
    assert_eq!(store.get::<u32>(handle, "Kept"), Ok(1));
    assert_eq!(store.get::<u32>(handle, "Lost"), Err(KvError::NotFound));
}

#[test]
fn test_corrupt_newest_block_falls_back() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set::<u8>(handle, "A", 1).unwrap();
    store.commit(handle).unwrap();
    store.set::<u8>(handle, "A", 2).unwrap();
    store.commit(handle).unwrap();
    assert_eq!(store.stats("nvs").unwrap().active_block, Some(1));

    let mut flash = store.into_flash();
    flash.inject_corruption(block_address(1) + BlockHeader::SIZE as u32, 4);

    let (mut store, handle) = mount(flash);
    assert_eq!(store.get::<u8>(handle, "A"), Ok(1));
    assert_eq!(store.stats("nvs").unwrap().active_block, Some(0));

    // The next commit moves past the corrupt block
    store.set::<u8>(handle, "A", 3).unwrap();
    store.commit(handle).unwrap();
    let (mut store, handle) = remount(&store);
    assert_eq!(store.get::<u8>(handle, "A"), Ok(3));
}

#[test]
fn test_torn_commit_keeps_previous_snapshot() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set_str(handle, "Name", "before").unwrap();
    store.commit(handle).unwrap();

    store.set_str(handle, "Name", "after").unwrap();
    store.flash_mut().simulate_power_loss();
    store.commit(handle).unwrap();

    let (mut store, handle) = remount(&store);
    let mut buf = [0u8; 8];
    assert_eq!(store.get_str(handle, "Name", &mut buf), Ok(7));
    assert_eq!(&buf[..7], b"before\0");
}

#[test]
fn test_failed_write_keeps_changes_pending() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set::<u8>(handle, "A", 1).unwrap();
    store.flash_mut().fail_next_writes(1);

    assert!(store.commit(handle).is_err());
    assert_eq!(store.stats("nvs").unwrap().total_commits, 0);

    store.commit(handle).unwrap();
    let (mut store, handle) = remount(&store);
    assert_eq!(store.get::<u8>(handle, "A"), Ok(1));
}

#[test]
fn test_foreign_format_needs_erase() {
    let mut flash = MockFlash::new();
    let mut header = BlockHeader::new(1, 0, 0);
    header.version = FORMAT_VERSION + 1;
    flash.write(block_address(2), &header.to_bytes()).unwrap();

    let mut store = FlashKvStore::new(flash);
    let err = store.init_partition("nvs").unwrap_err();
    assert_eq!(err, KvError::NewVersionFound);
    assert!(err.needs_erase());

    store.erase_partition("nvs").unwrap();
    store.init_partition("nvs").unwrap();
    assert!(store.is_mounted("nvs"));
}

#[test]
fn test_garbage_needs_erase() {
    let mut flash = MockFlash::new();
    flash.inject_corruption(block_address(0), 64);

    let mut store = FlashKvStore::new(flash);
    assert_eq!(store.init_partition("nvs"), Err(KvError::NoFreePages));

    store.erase_partition("nvs").unwrap();
    assert_eq!(store.init_partition("nvs"), Ok(()));
    assert_eq!(store.stats("nvs").unwrap().erase_counts, [1, 1, 1, 1]);
}

#[test]
fn test_erase_partition_drops_handles() {
    let (mut store, handle) = mount(MockFlash::new());
    store.set::<u8>(handle, "A", 1).unwrap();
    store.commit(handle).unwrap();

    store.erase_partition("nvs").unwrap();
    assert_eq!(store.get::<u8>(handle, "A"), Err(KvError::InvalidHandle));

    let (mut store, handle) = remount(&store);
    assert_eq!(store.get::<u8>(handle, "A"), Err(KvError::NotFound));
}

#[test]
fn test_read_only_open_of_missing_namespace() {
    let mut store = FlashKvStore::new(MockFlash::new());
    store.init_partition("nvs").unwrap();
    assert_eq!(
        store.open("nvs", "ghost", OpenMode::ReadOnly),
        Err(KvError::NotFound)
    );
}

#[test]
fn test_prefs_persist_across_reboot() {
    let flash = {
        let prefs = Prefs::new(FlashKvStore::new(MockFlash::new()), "App", 2).unwrap();
        let name = prefs.declare("DeviceName", String::from("rover")).unwrap();
        let trim = prefs.declare("Trim", 0i16).unwrap();
        prefs.init(&mut ResetOnFirstBoot).unwrap();

        name.set(String::from("boat"));
        trim.set(-15);
        prefs.with_store(|store| store.flash().clone())
    };

    let prefs = Prefs::new(FlashKvStore::new(flash), "App", 2).unwrap();
    let name = prefs.declare("DeviceName", String::from("rover")).unwrap();
    let trim = prefs.declare("Trim", 0i16).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    assert_eq!(prefs.stored_version(), Some(2));
    assert_eq!(name.get(), "boat");
    assert_eq!(trim.get(), -15);
    assert_eq!(prefs.get("Trim"), "-15");
}

#[test]
fn test_prefs_recover_unusable_partition() {
    let mut flash = MockFlash::new();
    flash.inject_corruption(block_address(3), 32);

    let prefs = Prefs::new(FlashKvStore::new(flash), "App", 1).unwrap();
    let volume = prefs.declare("Volume", 5u8).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    assert_eq!(prefs.status(), Status::Ready);
    assert_eq!(prefs.stored_version(), Some(0));
    assert_eq!(volume.set(6), 1);
    assert!(prefs.with_store(|store| store.is_mounted("nvs")));
}

#[test]
fn test_full_partition_rejects_write_and_keeps_committing() {
    let chunk = "x".repeat(MAX_STR_LEN);
    let flash = {
        let prefs = Prefs::new(FlashKvStore::new(MockFlash::new()), "App", 1).unwrap();
        let first = prefs.declare("S1", String::new()).unwrap();
        let second = prefs.declare("S2", String::new()).unwrap();
        let third = prefs.declare("S3", String::new()).unwrap();
        let volume = prefs.declare("Volume", 5u8).unwrap();
        prefs.init(&mut NoMigration).unwrap();

        assert_eq!(first.set(chunk.clone()), MAX_STR_LEN);
        assert_eq!(second.set(chunk.clone()), MAX_STR_LEN);
        assert_eq!(third.set(chunk.clone()), 0);
        assert_eq!(volume.set(9), 1);
        prefs.with_store(|store| store.flash().clone())
    };

    let prefs = Prefs::new(FlashKvStore::new(flash), "App", 1).unwrap();
    let third = prefs.declare("S3", String::new()).unwrap();
    let volume = prefs.declare("Volume", 5u8).unwrap();
    prefs.init(&mut NoMigration).unwrap();

    assert_eq!(prefs.stored_version(), Some(1));
    assert_eq!(volume.get(), 9);
    assert_eq!(third.get(), "");
}
