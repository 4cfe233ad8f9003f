/*!
Built-in DDR4 organization and timing presets, plus the secondary-timing
lookup tables (nRRDS/nRRDL/nFAW by dq x rate, nRFC/nREFI by density).

Grounded on the `org_presets`/`timing_presets`/`dq2rrds`/`density2rfc`-style
tables scattered through `DDR4::DDR4` and `DDR4::set_timing_vals` in
`examples/original_source/src/dram/impl/DDR4.cpp`. The original keys these
off string names parsed from a YAML config; here a caller builds a
`Device` either from a named preset (`PresetRegistry::organization`/
`timing`) or a fully custom `TimingValues`/`Organization`, matching spec
§6's external-interface contract ("presets are conveniences, not the only
entry point").
*/

use crate::device::level::{Level, Organization};
use crate::device::timing::TimingValues;
use crate::error::ConfigError;

/// Density/bank-count organization presets, named as in the original's
/// config examples (`"DDR4_2Gb_x8"` etc.).
pub fn organization_preset(name: &str) -> Result<Organization, ConfigError> {
    let mut count = [1u64; 6];
    let (density_mb, dq, bank_groups, banks_per_group, rows, cols) = match name {
        "DDR4_2Gb_x8" => (2 << 10, 8, 4, 4, 1 << 14, 1 << 10),
        "DDR4_4Gb_x8" => (4 << 10, 8, 4, 4, 1 << 15, 1 << 10),
        "DDR4_8Gb_x8" => (8 << 10, 8, 4, 4, 1 << 16, 1 << 10),
        "DDR4_16Gb_x4" => (16 << 10, 4, 4, 4, 1 << 18, 1 << 10),
        other => return Err(ConfigError::UnknownOrgPreset(other.to_string())),
    };
    count[Level::BankGroup.index()] = bank_groups;
    count[Level::Bank.index()] = banks_per_group;
    count[Level::Row.index()] = rows;
    count[Level::Column.index()] = cols;
    Ok(Organization { count, density_mb, dq, channel_width: 64 })
}

/// Primary timing presets, grounded on `DDR4::timing_presets`'s
/// `DDR4_1600J`..`DDR4_3200W` rows. Secondary timings (nRRDS/nRRDL/nFAW,
/// nRFC/nREFI) are filled in afterward from the density/dq-keyed tables
/// below, matching `set_timing_vals`'s two-pass resolution.
pub fn timing_preset(name: &str) -> Result<TimingValues, ConfigError> {
    // (rate, nCL=nRCD=nRP, nRAS, nRC, nWR, nRTP, nCWL)
    let (rate, n_cl, n_ras, n_wr, n_rtp, n_cwl) = match name {
        "DDR4_1600J" => (1600, 10, 28, 12, 6, 9),
        "DDR4_2133N" => (2133, 14, 32, 14, 7, 11),
        "DDR4_2400U" => (2400, 15, 36, 16, 9, 12),
        "DDR4_2666V" => (2666, 17, 39, 18, 9, 14),
        "DDR4_2933W" => (2933, 19, 44, 20, 10, 15),
        "DDR4_3200W" => (3200, 20, 52, 24, 12, 16),
        "DDR4_3600" => (3600, 22, 59, 26, 13, 18),
        "DDR4_4000" => (4000, 24, 65, 28, 14, 20),
        other => return Err(ConfigError::UnknownTimingPreset(other.to_string())),
    };
    let n_rcd = n_cl;
    let n_rp = n_cl;
    let n_rc = n_ras + n_rp;
    let n_bl = 4;
    let n_ccds = 4;
    let n_ccdl = if rate >= 2666 { 8 } else { 6 };
    let n_wtrs = 4;
    let n_wtrl = if rate >= 2666 { 12 } else { 9 };
    let tck_ps = 2_000_000 / rate;
    Ok(TimingValues {
        rate,
        n_bl,
        n_cl,
        n_rcd,
        n_rp,
        n_ras,
        n_rc,
        n_wr,
        n_rtp,
        n_cwl,
        n_ccds,
        n_ccdl,
        n_rrds: 0,
        n_rrdl: 0,
        n_wtrs,
        n_wtrl,
        n_faw: 0,
        n_rfc: 0,
        n_refi: 0,
        n_cs: 2,
        tck_ps,
    })
}

/// `nRRDS`/`nRRDL`/`nFAW` depend on `dq` and `rate`, not just the speed
/// grade -- grounded on the `dq2rrds`/`dq2faw`-style switch in
/// `DDR4::set_timing_vals`.
pub fn activation_window(dq: u32, rate: i64) -> (i64 /* nRRDS */, i64 /* nRRDL */, i64 /* nFAW */) {
    match dq {
        4 => (4, 7, if rate <= 2666 { 20 } else { 28 }),
        8 => (4, 6, if rate <= 2666 { 20 } else { 28 }),
        _ => (6, 8, if rate <= 2666 { 26 } else { 36 }),
    }
}

/// `nRFC`/`nREFI` depend on density alone -- grounded on
/// `DDR4::set_timing_vals`'s density-keyed refresh table.
pub fn refresh_window(density_mb: u64) -> (i64 /* nRFC */, i64 /* nREFI */) {
    match density_mb {
        d if d <= 2 << 10 => (160, 9360),
        d if d <= 4 << 10 => (260, 9360),
        d if d <= 8 << 10 => (350, 9360),
        _ => (550, 9360),
    }
}

/// Build a fully-resolved `TimingValues` from a speed-grade preset plus an
/// organization's `dq`/`density_mb`, the way `Device::from_presets` wires
/// the two together. Returns `Err(RateConflictsWithPreset)` if the caller
/// also supplied an explicit rate that disagrees with the preset's (spec
/// §7: presets and explicit overrides must not silently diverge).
pub fn resolve_timing(preset: &str, organization: &Organization, explicit_rate: Option<i64>) -> Result<TimingValues, ConfigError> {
    let mut values = timing_preset(preset)?;
    if let Some(rate) = explicit_rate {
        if rate != values.rate {
            return Err(ConfigError::RateConflictsWithPreset);
        }
    }
    let (n_rrds, n_rrdl, n_faw) = activation_window(organization.dq, values.rate);
    let (n_rfc, n_refi) = refresh_window(organization.density_mb);
    values.n_rrds = n_rrds;
    values.n_rrdl = n_rrdl;
    values.n_faw = n_faw;
    values.n_rfc = n_rfc;
    values.n_refi = n_refi;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_org_preset_resolves() {
        let org = organization_preset("DDR4_2Gb_x8").unwrap();
        org.validate_density().unwrap();
    }

    #[test]
    fn unknown_preset_is_an_error() {
        assert!(matches!(organization_preset("nonsense"), Err(ConfigError::UnknownOrgPreset(_))));
    }

    #[test]
    fn resolve_timing_fills_secondary_fields() {
        let org = organization_preset("DDR4_2Gb_x8").unwrap();
        let v = resolve_timing("DDR4_3200W", &org, None).unwrap();
        assert_eq!(v.n_faw, 28);
        assert_eq!(v.n_rfc, 160);
    }

    #[test]
    fn conflicting_explicit_rate_errors() {
        let org = organization_preset("DDR4_2Gb_x8").unwrap();
        assert!(matches!(resolve_timing("DDR4_3200W", &org, Some(1600)), Err(ConfigError::RateConflictsWithPreset)));
    }
}
