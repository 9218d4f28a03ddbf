//! Flux helpers around simulated model tables and observation input files.

use crate::domain::{CigaleError, CigaleResult};
use crate::serialization::{format_fixed_f64, write_text_artifact};
use crate::table::ModelTable;
use std::path::Path;

pub const MPC_IN_METRES: f64 = 3.085_677_581_491_367e22;
pub const LUMINOSITY_DISTANCE_COLUMN: &str = "universe.luminosity_distance";
pub const STELLAR_MASS_COLUMN: &str = "stellar.m_star";

/// Scales each model's flux in `band` to a stellar mass of `mstar_scale`
/// (solar masses) placed at `dist_scale_mpc` megaparsecs.
pub fn rescale_band_flux(
    table: &ModelTable,
    band: &str,
    mstar_scale: f64,
    dist_scale_mpc: f64,
) -> CigaleResult<Vec<f64>> {
    if !(mstar_scale > 0.0) || !(dist_scale_mpc > 0.0) {
        return Err(CigaleError::InvalidArgument(format!(
            "flux rescaling needs positive mass and distance, got {} and {}",
            mstar_scale, dist_scale_mpc
        )));
    }

    let flux = table.float_column(band)?;
    let distance_m = table.float_column(LUMINOSITY_DISTANCE_COLUMN)?;
    let stellar_mass = table.float_column(STELLAR_MASS_COLUMN)?;
    let target_distance_m = dist_scale_mpc * MPC_IN_METRES;

    Ok(flux
        .iter()
        .zip(&distance_m)
        .zip(&stellar_mass)
        .map(|((flux, distance), mass)| {
            let mass_factor = mstar_scale / mass;
            let distance_factor = (distance / target_distance_m).powi(2);
            flux * mass_factor * distance_factor
        })
        .collect())
}

/// One source row of a CIGALE observation file.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxObservation {
    pub id: String,
    pub redshift: f64,
    /// Distance in Mpc. Always supplied by the caller.
    pub distance: f64,
    pub fluxes: Vec<f64>,
    pub flux_errors: Vec<f64>,
}

pub fn render_flux_file(
    band_names: &[String],
    observations: &[FluxObservation],
) -> CigaleResult<String> {
    let mut content = String::from("# id             redshift  distance   ");
    for band in band_names {
        content.push_str(band);
        content.push_str("   ");
        content.push_str(band);
        content.push_str("_err   ");
    }
    content.push_str(" \n");

    for observation in observations {
        if observation.fluxes.len() != band_names.len()
            || observation.flux_errors.len() != band_names.len()
        {
            return Err(CigaleError::InvalidArgument(format!(
                "source '{}' has {} fluxes and {} errors for {} bands",
                observation.id,
                observation.fluxes.len(),
                observation.flux_errors.len(),
                band_names.len()
            )));
        }

        content.push_str(&format!(
            " {}   {}   {}  ",
            observation.id,
            format_fixed_f64(observation.redshift, 6),
            format_fixed_f64(observation.distance, 6)
        ));
        for (flux, error) in observation.fluxes.iter().zip(&observation.flux_errors) {
            content.push_str(&format_fixed_f64(*flux, 15));
            content.push_str("   ");
            content.push_str(&format_fixed_f64(*error, 15));
            content.push_str("   ");
        }
        content.push_str(" \n");
    }

    Ok(content)
}

pub fn write_flux_file(
    path: impl AsRef<Path>,
    band_names: &[String],
    observations: &[FluxObservation],
) -> CigaleResult<()> {
    let content = render_flux_file(band_names, observations)?;
    write_text_artifact(path.as_ref(), &content)
}

#[cfg(test)]
mod tests {
    use super::{FluxObservation, MPC_IN_METRES, render_flux_file, rescale_band_flux};
    use crate::table::{ColumnData, ModelTable};

    fn model_table() -> ModelTable {
        ModelTable::new()
            .with_column("hst.wfc3.F555W", ColumnData::Float(vec![2.0, 8.0]))
            .and_then(|table| {
                table.with_column(
                    "universe.luminosity_distance",
                    ColumnData::Float(vec![10.0 * MPC_IN_METRES, 5.0 * MPC_IN_METRES]),
                )
            })
            .and_then(|table| {
                table.with_column("stellar.m_star", ColumnData::Float(vec![1.0, 4.0]))
            })
            .expect("table should be consistent")
    }

    #[test]
    fn flux_scales_with_mass_and_inverse_square_distance() {
        let scaled = rescale_band_flux(&model_table(), "hst.wfc3.F555W", 100.0, 20.0)
            .expect("columns exist");

        // scale factors (100 / 1) * (10 / 20)^2 = 25 and (100 / 4) * (5 / 20)^2 = 1.5625
        assert!((scaled[0] - 50.0).abs() < 1.0e-9);
        assert!((scaled[1] - 12.5).abs() < 1.0e-9);
    }

    #[test]
    fn rescaling_requires_known_columns_and_positive_scales() {
        let table = model_table();
        assert_eq!(
            rescale_band_flux(&table, "hst.wfc.F814W", 1.0, 1.0)
                .expect_err("band is absent")
                .placeholder(),
            "RUN.MISSING_COLUMN"
        );
        assert!(rescale_band_flux(&table, "hst.wfc3.F555W", 0.0, 1.0).is_err());
    }

    #[test]
    fn flux_file_layout_matches_cigale_input() {
        let bands = vec!["hst.wfc3.F555W".to_string()];
        let observations = vec![FluxObservation {
            id: "0".to_string(),
            redshift: 0.0,
            distance: 9.9,
            fluxes: vec![1.5],
            flux_errors: vec![0.5],
        }];

        let content = render_flux_file(&bands, &observations).expect("shapes agree");
        assert_eq!(
            content,
            "# id             redshift  distance   hst.wfc3.F555W   hst.wfc3.F555W_err    \n \
             0   0.000000   9.900000  1.500000000000000   0.500000000000000    \n"
        );
    }

    #[test]
    fn flux_file_rejects_mismatched_rows() {
        let bands = vec!["a".to_string(), "b".to_string()];
        let observations = vec![FluxObservation {
            id: "src".to_string(),
            redshift: 0.1,
            distance: 1.0,
            fluxes: vec![1.0],
            flux_errors: vec![1.0, 2.0],
        }];
        assert!(render_flux_file(&bands, &observations).is_err());
    }
}
