// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial(applet_env)]
fn disabled_when_env_unset() {
    let id = AppletId::new("specs-gate-unset");
    std::env::remove_var(id.enablement_env_key());
    assert!(!applet_enabled(&id));
}

#[test]
#[serial(applet_env)]
fn enabled_when_value_is_bun_case_insensitive() {
    let id = AppletId::new("specs-gate-bun");
    std::env::set_var(id.enablement_env_key(), "BuN");
    assert!(applet_enabled(&id));
    std::env::remove_var(id.enablement_env_key());
}

#[test]
#[serial(applet_env)]
fn disabled_for_other_values() {
    let id = AppletId::new("specs-gate-other");
    std::env::set_var(id.enablement_env_key(), "node");
    assert!(!applet_enabled(&id));
    std::env::remove_var(id.enablement_env_key());
}

#[test]
fn empty_applet_id_is_always_disabled() {
    assert!(!applet_enabled(&AppletId::new("")));
}

#[test]
#[serial(applet_env)]
fn bun_bin_override_trims_and_treats_blank_as_unset() {
    std::env::set_var("IOTA_APPLET_ENGINE_BUN_BIN", "  /opt/bun  ");
    assert_eq!(bun_bin_override(), Some("/opt/bun".to_string()));
    assert_eq!(bun_bin(), "/opt/bun");

    std::env::set_var("IOTA_APPLET_ENGINE_BUN_BIN", "   ");
    assert_eq!(bun_bin_override(), None);
    assert_eq!(bun_bin(), "bun");

    std::env::remove_var("IOTA_APPLET_ENGINE_BUN_BIN");
}

#[test]
fn default_timings_match_spec_defaults() {
    std::env::remove_var("IOTA_APPLET_ENGINE_HEALTH_TIMEOUT_MS");
    std::env::remove_var("IOTA_APPLET_ENGINE_HEALTH_POLL_MS");
    std::env::remove_var("IOTA_APPLET_ENGINE_SHUTDOWN_GRACE_MS");
    std::env::remove_var("IOTA_APPLET_ENGINE_RESPAWN_TIMEOUT_MS");

    assert_eq!(health_timeout(), Duration::from_secs(8));
    assert_eq!(health_poll_delay(), Duration::from_millis(150));
    assert_eq!(shutdown_grace(), Duration::from_secs(3));
    assert_eq!(respawn_timeout(), Duration::from_secs(30));
}
