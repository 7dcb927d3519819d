//! Humid-air density
//!
//! Water vapour displaces dry air, so humid air is lighter; on a warm
//! humid day the drag term shrinks noticeably. Saturation pressure uses
//! the Magnus formula.

/// Specific gas constant of dry air (J/(kg·K)).
const R_DRY: f64 = 287.05;

/// Specific gas constant of water vapour (J/(kg·K)).
const R_VAPOUR: f64 = 461.495;

/// Air density from station pressure (mbar), temperature (°C) and
/// relative humidity (%), in kg/m³.
pub fn humid_air_density(pressure_mbar: f64, temperature_c: f64, humidity_pct: f64) -> f64 {
    let pressure_pa = pressure_mbar * 100.0;
    let temperature_k = temperature_c + 273.15;

    let saturation_pa = 610.78 * (17.27 * temperature_c / (237.7 + temperature_c)).exp();
    let vapour_pa = humidity_pct / 100.0 * saturation_pa;
    let dry_pa = pressure_pa - vapour_pa;

    dry_pa / (R_DRY * temperature_k) + vapour_pa / (R_VAPOUR * temperature_k)
}
