//! Conversion between the remotely stored VAT basis points and the percentage shown to managers.

use crate::models::SupplierProfile;

/// `bps / 100`. Zero or missing rates read as no VAT.
pub fn percentage_from_basis_points(basis_points: Option<u32>) -> Option<f64> {
    let percentage = f64::from(basis_points.unwrap_or(0)) / 100.0;
    (percentage != 0.0).then_some(percentage)
}

/// `round(percentage * 100)`. Zero, negative or missing percentages clear the rate.
pub fn basis_points_from_percentage(percentage: Option<f64>) -> Option<u32> {
    match percentage {
        Some(p) if p.is_finite() && p > 0.0 => Some((p * 100.0).round() as u32),
        _ => None,
    }
}

impl SupplierProfile {
    /// Fill `vat_rate_percentage` from the stored basis points.
    pub fn with_vat_percentage(mut self) -> Self {
        self.vat_rate_percentage = percentage_from_basis_points(self.vat_basis_points_rate);
        self
    }

    /// Fill `vat_basis_points_rate` from the edited percentage before saving.
    pub fn with_vat_basis_points(mut self) -> Self {
        self.vat_basis_points_rate = basis_points_from_percentage(self.vat_rate_percentage);
        self
    }
}
