use std::marker::PhantomData;
use serde::{Deserialize, Serialize};
use geojson::{Geometry, JsonObject};
use ts_rs::TS;
use schemars::JsonSchema;

use crate::types::Category;

/// Properties attached to every detected region feature
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS, JsonSchema)]
#[ts(export)]
#[schemars(description = "Properties for detected panel regions")]
pub struct RegionProperties {
    #[schemars(description = "Index of the region within its category")]
    pub id: u32,
    #[schemars(description = "Whether the region is text or a sound effect")]
    pub category: Category,
    #[schemars(description = "Area of the region in square pixels")]
    pub area: f64,
}

/// Type alias for detection GeoJSON
pub type PanelGeoJson = TypedGeoJson<RegionProperties>;

/// A typed GeoJSON Feature that is generic over its properties.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = geojson::Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties).ok().and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    /// Tries to access the typed properties of the feature.
    pub fn properties(&self) -> Option<P> {
        self.feature.properties.as_ref().and_then(|p| {
            serde_json::from_value(serde_json::Value::Object(p.clone())).ok()
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeatureCollection<P> {
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    pub foreign_members: Option<JsonObject>,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum TypedGeoJson<P> {
    Geometry(Geometry),
    Feature(TypedFeature<P>),
    FeatureCollection(TypedFeatureCollection<P>),
}

impl<P> TypedGeoJson<P> {
    pub fn as_feature_collection(&self) -> Option<&TypedFeatureCollection<P>> {
        match self {
            TypedGeoJson::FeatureCollection(fc) => Some(fc),
            _ => None,
        }
    }
}

impl PanelGeoJson {
    /// Features belonging to one category
    pub fn features_in(&self, category: Category) -> Vec<&TypedFeature<RegionProperties>> {
        let Some(fc) = self.as_feature_collection() else {
            return Vec::new();
        };
        fc.features
            .iter()
            .filter(|feature| feature.properties().is_some_and(|props| props.category == category))
            .collect()
    }

    /// Get the largest feature by area
    pub fn largest_feature(&self) -> Option<&TypedFeature<RegionProperties>> {
        self.as_feature_collection()?.features.iter().max_by(|a, b| {
            let area_a = a.properties().map(|p| p.area).unwrap_or(0.0);
            let area_b = b.properties().map(|p| p.area).unwrap_or(0.0);
            area_a.total_cmp(&area_b)
        })
    }
}
