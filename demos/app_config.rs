//! Application configuration demo
//!
//! Declares a handful of preferences, opens them on a simulated flash chip,
//! edits them through the typed and text APIs, then "reboots" onto the same
//! flash image and runs a v1 → v2 migration.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example app_config --features mock
//! ```

use flash_prefs::core::nvs::FlashKvStore;
use flash_prefs::core::prefs::{
    MigrationError, MigrationHook, Prefs, PrefsConfig, ResetOnFirstBoot,
};
use flash_prefs::platform::mock::MockFlash;

type Store = FlashKvStore<MockFlash>;

/// v1 stored the volume as 0..=10, v2 uses percent
struct VolumeToPercent;

impl MigrationHook<Store> for VolumeToPercent {
    fn on_init(
        &mut self,
        prefs: &Prefs<Store>,
        stored: u32,
        current: u32,
    ) -> Result<(), MigrationError> {
        println!("on_init: stored version {stored}, current {current}");
        match stored {
            0 => self.reset(prefs),
            1 => {
                let old: u8 = prefs.try_get("Volume")?.parse().unwrap_or(5);
                prefs.try_set("Volume", &(old.min(10) * 10).to_string())?;
                Ok(())
            }
            2 => Ok(()),
            from => Err(MigrationError::Unsupported { from, to: current }),
        }
    }

    fn reset(&mut self, prefs: &Prefs<Store>) -> Result<(), MigrationError> {
        println!("reset: {} defaults written", prefs.reset_all());
        Ok(())
    }
}

fn dump(prefs: &Prefs<Store>) {
    for key in prefs.registry().keys() {
        println!("  {key} = {}", prefs.get(key));
    }
}

fn main() {
    // First boot on firmware v1
    let flash = {
        let config = PrefsConfig::new("App", 1).expect("valid namespace");
        let prefs = Prefs::with_config(Store::new(MockFlash::new()), config);
        let name = prefs.declare("DeviceName", String::from("rover")).expect("declare");
        let volume = prefs.declare("Volume", 5u8).expect("declare");
        prefs.declare("Autostart", false).expect("declare");

        if let Err(e) = prefs.init(&mut ResetOnFirstBoot) {
            eprintln!("init failed: {e}");
            return;
        }
        println!("v1 status: {:?}", prefs.status());

        name.set(String::from("boat-7"));
        volume.set(8);
        {
            let _batch = prefs.batch();
            prefs.set("Autostart", "true");
            prefs.set("DeviceName", "boat-7b");
        }
        dump(&prefs);

        prefs.with_store(|store| store.flash().clone())
    };

    // Reboot onto firmware v2
    let prefs = Prefs::new(Store::new(flash), "App", 2).expect("valid namespace");
    let volume = prefs.declare("Volume", 50u8).expect("declare");
    prefs.declare("DeviceName", String::from("rover")).expect("declare");
    prefs.declare("Autostart", false).expect("declare");

    match prefs.init(&mut VolumeToPercent) {
        Ok(()) => println!("v2 status: {:?}", prefs.status()),
        Err(e) => {
            eprintln!("init failed: {e}");
            return;
        }
    }
    dump(&prefs);
    println!("volume is now {}%", volume.get());

    let mut buf = [0u8; 4];
    if !prefs.get_into("DeviceName", &mut buf) {
        println!("DeviceName does not fit in {} bytes", buf.len());
    }
    if let Some(stats) = prefs.with_store(|store| store.stats("nvs").cloned()) {
        println!(
            "nvs: {} commits, active block {:?}",
            stats.total_commits, stats.active_block
        );
    }
}
