use guardcore::model::{PhotoUpload, ReportSubmission};
use guardcore::prelude::Coordinate;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub enum FormField {
    Address,
    Latitude,
    Longitude,
    Description,
    PhotoPath,
}

#[derive(Debug, Clone, Copy)]
pub enum Observation {
    Smoke,
    Flames,
    Smell,
}

/// Editable state of the fire-report form. Kept intact when a submission fails.
#[derive(Debug, Clone, Default)]
pub struct ReportForm {
    pub address: String,
    pub latitude: String,
    pub longitude: String,
    pub description: String,
    pub photo_path: String,
    pub has_visible_smoke: bool,
    pub has_visible_flames: bool,
    pub has_smell: bool,
    pub submitting: bool,
}

impl ReportForm {
    pub fn update_field(&mut self, field: FormField, value: String) {
        match field {
            FormField::Address => self.address = value,
            FormField::Latitude => self.latitude = value,
            FormField::Longitude => self.longitude = value,
            FormField::Description => self.description = value,
            FormField::PhotoPath => self.photo_path = value,
        }
    }

    pub fn toggle(&mut self, observation: Observation) {
        let flag = match observation {
            Observation::Smoke => &mut self.has_visible_smoke,
            Observation::Flames => &mut self.has_visible_flames,
            Observation::Smell => &mut self.has_smell,
        };
        *flag = !*flag;
    }

    pub fn is_checked(&self, observation: Observation) -> bool {
        match observation {
            Observation::Smoke => self.has_visible_smoke,
            Observation::Flames => self.has_visible_flames,
            Observation::Smell => self.has_smell,
        }
    }

    /// Latitude/longitude pair typed in place of a device fix. Both blank means none.
    pub fn device_location(&self) -> Result<Option<Coordinate>, String> {
        let lat = self.latitude.trim();
        let lon = self.longitude.trim();
        if lat.is_empty() && lon.is_empty() {
            return Ok(None);
        }
        match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon))
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) =>
            {
                Ok(Some(Coordinate::new(lat, lon)))
            }
            _ => Err("Enter a valid latitude and longitude, or leave both blank".into()),
        }
    }

    pub fn photo_file(&self) -> Option<&str> {
        let path = self.photo_path.trim();
        (!path.is_empty()).then_some(path)
    }

    pub fn to_submission(&self, photo: Option<PhotoUpload>) -> Result<ReportSubmission, String> {
        let address = self.address.trim();
        Ok(ReportSubmission {
            description: self.description.trim().to_string(),
            has_visible_smoke: self.has_visible_smoke,
            has_visible_flames: self.has_visible_flames,
            has_smell: self.has_smell,
            address: (!address.is_empty()).then(|| address.to_string()),
            device_location: self.device_location()?,
            photo,
        })
    }

    /// Clears every field after a successful submission.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

pub async fn read_photo(path: String) -> Result<PhotoUpload, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Failed to read photo {path}: {e}"))?;
    let path = Path::new(&path);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("photo")
        .to_string();
    Ok(PhotoUpload {
        file_name,
        content_type: content_type_for(path).to_string(),
        bytes,
    })
}
