use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

use crate::{
    error::{MaskError, Result},
    typed_geojson::{PanelGeoJson, RegionProperties, TypedFeature, TypedFeatureCollection, TypedGeoJson},
    types::{BoxSet, Category, Detections, ImageDimensions, PolygonRegion, PolygonSet},
};

/// Closed exterior ring in GeoJSON coordinate order
fn ring(vertices: &[[f32; 2]]) -> Vec<Vec<f64>> {
    let mut ring: Vec<Vec<f64>> = vertices.iter().map(|&[x, y]| vec![x as f64, y as f64]).collect();
    if let Some(first) = ring.first().cloned() {
        if ring.last() != Some(&first) {
            ring.push(first);
        }
    }
    ring
}

impl Detections {
    /// Every region as `(category, per-category index, polygon)`, text first
    fn regions(&self) -> impl Iterator<Item = (Category, usize, PolygonRegion)> + '_ {
        let text = self.text.iter().enumerate().map(|(i, b)| (Category::Text, i, b.to_polygon()));
        let sound = self.sound.iter().enumerate().map(|(i, p)| (Category::Sound, i, p.clone()));
        text.chain(sound)
    }

    fn properties(category: Category, id: usize, polygon: &PolygonRegion) -> RegionProperties {
        RegionProperties {
            id: id as u32,
            category,
            area: polygon.area(),
        }
    }

    fn metadata(&self, dims: ImageDimensions) -> JsonObject {
        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("image_width".to_string(), serde_json::Value::from(dims.width));
        foreign_members.insert("image_height".to_string(), serde_json::Value::from(dims.height));
        foreign_members.insert("region_count".to_string(), serde_json::Value::from(self.region_count()));
        foreign_members
    }

    /// Export to typed GeoJSON format
    pub fn to_typed_geojson(&self, dims: ImageDimensions) -> Result<PanelGeoJson> {
        let features = self
            .regions()
            .map(|(category, id, polygon)| {
                let geometry = Geometry::new(Value::Polygon(vec![ring(&polygon.vertices)]));
                TypedFeature::new(Some(geometry), Self::properties(category, id, &polygon))
            })
            .collect();

        Ok(TypedGeoJson::FeatureCollection(TypedFeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(self.metadata(dims)),
        }))
    }

    pub fn to_geojson(&self, dims: ImageDimensions) -> Result<FeatureCollection> {
        let mut features = Vec::new();
        for (index, (category, id, polygon)) in self.regions().enumerate() {
            let properties = serde_json::to_value(Self::properties(category, id, &polygon))?;
            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Polygon(vec![ring(&polygon.vertices)]))),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(index))),
                properties: properties.as_object().cloned(),
                foreign_members: None,
            });
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(self.metadata(dims)),
        })
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self, dims: ImageDimensions) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson(dims)?)?)
    }

    pub fn save_geojson<P: AsRef<Path>>(&self, dims: ImageDimensions, path: P) -> Result<()> {
        std::fs::write(path, self.to_geojson_string(dims)?)?;
        Ok(())
    }

    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let geojson_str = std::fs::read_to_string(path)?;
        Self::from_geojson_string(&geojson_str)
    }

    /// Read detections back; text rings become their bounding rectangle.
    ///
    /// Non-polygon geometries are skipped.
    pub fn from_geojson_string(geojson_str: &str) -> Result<Self> {
        let geojson: FeatureCollection = geojson_str.parse()?;
        let mut text = Vec::new();
        let mut sound = Vec::new();

        for feature in geojson.features {
            let Some(Geometry { value: Value::Polygon(coords), .. }) = feature.geometry else {
                continue;
            };
            let Some(exterior) = coords.first() else {
                continue;
            };

            let category = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("category"))
                .and_then(|value| value.as_str())
                .ok_or_else(|| MaskError::GeometricComputation("Feature is missing its category".to_string()))?
                .parse::<Category>()
                .map_err(|e| MaskError::GeometricComputation(format!("Unknown category: {e}")))?;

            let mut vertices: Vec<[f32; 2]> = exterior
                .iter()
                .filter(|coord| coord.len() >= 2)
                .map(|coord| [coord[0] as f32, coord[1] as f32])
                .collect();
            if vertices.len() > 1 && vertices.first() == vertices.last() {
                vertices.pop();
            }
            let polygon = PolygonRegion::new(vertices);

            match category {
                Category::Text => {
                    if let Some(bounds) = polygon.bounding_box() {
                        text.push(bounds);
                    }
                }
                Category::Sound => sound.push(polygon),
            }
        }

        Ok(Detections::new(BoxSet::new(text), PolygonSet::new(sound)))
    }
}

/// Image dimensions recorded in a detection file, if present
pub fn dimensions_from_geojson(geojson_str: &str) -> Result<Option<ImageDimensions>> {
    let geojson: FeatureCollection = geojson_str.parse()?;
    let Some(foreign) = geojson.foreign_members.as_ref() else {
        return Ok(None);
    };
    let width = foreign.get("image_width").and_then(|v| v.as_u64());
    let height = foreign.get("image_height").and_then(|v| v.as_u64());
    Ok(width.zip(height).map(|(width, height)| ImageDimensions {
        width: width as u32,
        height: height as u32,
    }))
}

/// Read detections for an image of `dims`.
///
/// A file that records different image dimensions is rejected with
/// [`MaskError::DimensionMismatch`]; files without the record are accepted.
pub fn load_detections_for<P: AsRef<Path>>(path: P, dims: ImageDimensions) -> Result<Detections> {
    let geojson_str = std::fs::read_to_string(path)?;
    if let Some(recorded) = dimensions_from_geojson(&geojson_str)? {
        if recorded != dims {
            return Err(MaskError::DimensionMismatch {
                expected: (dims.width, dims.height),
                actual: (recorded.width, recorded.height),
            });
        }
    }
    Detections::from_geojson_string(&geojson_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoxRegion;

    fn sample() -> Detections {
        Detections::new(
            BoxSet::new(vec![
                BoxRegion::new(10.0, 12.0, 40.0, 30.0),
                BoxRegion::new(60.0, 5.0, 90.0, 15.0),
            ]),
            PolygonSet::new(vec![PolygonRegion::new(vec![[50.0, 50.0], [80.0, 55.0], [65.0, 90.0]])]),
        )
    }

    const DIMS: ImageDimensions = ImageDimensions { width: 120, height: 100 };

    #[test]
    fn test_geojson_roundtrip() {
        let detections = sample();
        let text = detections.to_geojson_string(DIMS).unwrap();
        assert_eq!(Detections::from_geojson_string(&text).unwrap(), detections);
        assert_eq!(dimensions_from_geojson(&text).unwrap(), Some(DIMS));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.geojson");
        sample().save_geojson(DIMS, &path).unwrap();
        assert_eq!(Detections::from_geojson_file(&path).unwrap(), sample());
    }

    #[test]
    fn test_load_checks_recorded_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.geojson");
        sample().save_geojson(DIMS, &path).unwrap();

        assert_eq!(load_detections_for(&path, DIMS).unwrap(), sample());
        let other = ImageDimensions { width: 64, height: 64 };
        assert!(matches!(
            load_detections_for(&path, other),
            Err(MaskError::DimensionMismatch { expected: (64, 64), actual: (120, 100) })
        ));

        // files without the record are taken as they are
        let bare = r#"{"type": "FeatureCollection", "features": []}"#;
        std::fs::write(&path, bare).unwrap();
        assert_eq!(load_detections_for(&path, other).unwrap(), Detections::default());
    }

    #[test]
    fn test_typed_geojson_metadata() {
        let typed = sample().to_typed_geojson(DIMS).unwrap();
        let foreign = typed.as_feature_collection().and_then(|fc| fc.foreign_members.as_ref()).unwrap();
        assert_eq!(foreign.get("region_count").and_then(|v| v.as_u64()), Some(3));
        assert_eq!(typed.features_in(Category::Text).len(), 2);
        assert_eq!(typed.features_in(Category::Sound).len(), 1);

        let largest = typed.largest_feature().and_then(|f| f.properties()).unwrap();
        assert_eq!(largest, RegionProperties { id: 0, category: Category::Sound, area: 562.5 });
    }

    #[test]
    fn test_empty_detections() {
        let text = Detections::default().to_geojson_string(DIMS).unwrap();
        let restored = Detections::from_geojson_string(&text).unwrap();
        assert_eq!(restored.region_count(), 0);
    }

    #[test]
    fn test_missing_category_is_rejected() {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,0]]]},
                "properties": {"id": 0}
            }]
        }"#;
        assert!(matches!(
            Detections::from_geojson_string(raw),
            Err(MaskError::GeometricComputation(_))
        ));
    }
}
