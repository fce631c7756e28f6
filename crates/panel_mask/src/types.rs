use geo_types::{Coord, LineString, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use ts_rs::TS;

/// The two region types the pipeline distinguishes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema, TS,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Machine-printed text, detected as axis-aligned boxes
    Text,
    /// Sound effects and other decorative lettering, detected as polygons
    Sound,
}

/// Set of categories currently enabled by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Selection {
    pub text: bool,
    pub sound: bool,
}

impl Selection {
    pub const fn all() -> Self {
        Self { text: true, sound: true }
    }

    pub const fn none() -> Self {
        Self { text: false, sound: false }
    }

    pub fn only(category: Category) -> Self {
        Self::none().with(category, true)
    }

    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::Text => self.text,
            Category::Sound => self.sound,
        }
    }

    pub fn with(mut self, category: Category, enabled: bool) -> Self {
        match category {
            Category::Text => self.text = enabled,
            Category::Sound => self.sound = enabled,
        }
        self
    }

    pub fn toggled(self, category: Category) -> Self {
        let enabled = !self.contains(category);
        self.with(category, enabled)
    }

    pub fn is_empty(&self) -> bool {
        !self.text && !self.sound
    }

    pub fn categories(&self) -> Vec<Category> {
        [Category::Text, Category::Sound]
            .into_iter()
            .filter(|category| self.contains(*category))
            .collect()
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::all()
    }
}

/// Per-category dilation radius in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Padding {
    pub text: u32,
    pub sound: u32,
}

impl Padding {
    pub const DEFAULT_RADIUS: u32 = 10;

    pub const fn uniform(radius: u32) -> Self {
        Self { text: radius, sound: radius }
    }

    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Text => self.text,
            Category::Sound => self.sound,
        }
    }

    pub fn with(mut self, category: Category, radius: u32) -> Self {
        match category {
            Category::Text => self.text = radius,
            Category::Sound => self.sound = radius,
        }
        self
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT_RADIUS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, TS)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn of(image: &image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }
}

/// Axis-aligned box in pixel coordinates, `x1 <= x2` and `y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoxRegion {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoxRegion {
    /// Corners may be given in any order
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Inclusive integer bounds, truncated toward zero
    pub fn pixel_bounds(&self) -> (i64, i64, i64, i64) {
        (self.x1 as i64, self.y1 as i64, self.x2 as i64, self.y2 as i64)
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    /// Rectangle ring, clockwise from the top-left corner
    pub fn to_polygon(&self) -> PolygonRegion {
        PolygonRegion::new(vec![
            [self.x1, self.y1],
            [self.x2, self.y1],
            [self.x2, self.y2],
            [self.x1, self.y2],
        ])
    }
}

/// Polygon given by its ordered vertices in pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolygonRegion {
    pub vertices: Vec<[f32; 2]>,
}

impl PolygonRegion {
    pub fn new(vertices: Vec<[f32; 2]>) -> Self {
        Self { vertices }
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .vertices
            .iter()
            .map(|&[x, y]| Coord { x: x as f64, y: y as f64 })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    /// Smallest box containing every vertex
    pub fn bounding_box(&self) -> Option<BoxRegion> {
        use geo::BoundingRect;
        let rect = self.to_geo_polygon().bounding_rect()?;
        let (min, max) = (rect.min(), rect.max());
        Some(BoxRegion::new(min.x as f32, min.y as f32, max.x as f32, max.y as f32))
    }

    /// Integer vertices truncated toward zero, without a repeated closing vertex
    pub fn pixel_vertices(&self) -> Vec<(i64, i64)> {
        let mut points: Vec<(i64, i64)> = self
            .vertices
            .iter()
            .map(|&[x, y]| (x as i64, y as i64))
            .collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoxSet {
    pub boxes: Vec<BoxRegion>,
}

impl BoxSet {
    pub fn new(boxes: Vec<BoxRegion>) -> Self {
        Self { boxes }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxRegion> {
        self.boxes.iter()
    }
}

impl FromIterator<BoxRegion> for BoxSet {
    fn from_iter<I: IntoIterator<Item = BoxRegion>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolygonSet {
    pub polygons: Vec<PolygonRegion>,
}

impl PolygonSet {
    pub fn new(polygons: Vec<PolygonRegion>) -> Self {
        Self { polygons }
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolygonRegion> {
        self.polygons.iter()
    }
}

impl FromIterator<PolygonRegion> for PolygonSet {
    fn from_iter<I: IntoIterator<Item = PolygonRegion>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Raw output of a single detector for one image
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionSet {
    Polygons(PolygonSet),
    Boxes(BoxSet),
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        match self {
            Self::Polygons(set) => set.len(),
            Self::Boxes(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output of both detector capabilities for one image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detections {
    pub text: BoxSet,
    pub sound: PolygonSet,
}

impl Detections {
    pub fn new(text: BoxSet, sound: PolygonSet) -> Self {
        Self { text, sound }
    }

    pub fn region_count(&self) -> usize {
        self.text.len() + self.sound.len()
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Text => self.text.len(),
            Category::Sound => self.sound.len(),
        }
    }

    pub fn for_category(&self, category: Category) -> DetectionSet {
        match category {
            Category::Text => DetectionSet::Boxes(self.text.clone()),
            Category::Sound => DetectionSet::Polygons(self.sound.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_toggle_is_involutive() {
        let selection = Selection::all();
        let toggled = selection.toggled(Category::Text);
        assert!(!toggled.contains(Category::Text));
        assert!(toggled.contains(Category::Sound));
        assert_eq!(toggled.toggled(Category::Text), selection);
    }

    #[test]
    fn test_selection_categories_order() {
        assert_eq!(Selection::all().categories(), vec![Category::Text, Category::Sound]);
        assert!(Selection::none().categories().is_empty());
        assert!(Selection::none().is_empty());
    }

    #[test]
    fn test_padding_defaults_to_ten() {
        let padding = Padding::default();
        assert_eq!(padding.get(Category::Text), 10);
        assert_eq!(padding.get(Category::Sound), 10);
        assert_eq!(padding.with(Category::Sound, 3).sound, 3);
    }

    #[test]
    fn test_box_region_normalizes_corners() {
        let region = BoxRegion::new(30.0, 40.0, 10.0, 5.0);
        assert_eq!(region, BoxRegion::new(10.0, 5.0, 30.0, 40.0));
        assert_eq!(region.pixel_bounds(), (10, 5, 30, 40));
    }

    #[test]
    fn test_polygon_bounding_box_and_area() {
        let square = PolygonRegion::new(vec![[2.0, 2.0], [6.0, 2.0], [6.0, 6.0], [2.0, 6.0]]);
        assert!((square.area() - 16.0).abs() < 1e-6);
        assert_eq!(square.bounding_box(), Some(BoxRegion::new(2.0, 2.0, 6.0, 6.0)));
    }

    #[test]
    fn test_pixel_vertices_drop_closing_vertex() {
        let ring = PolygonRegion::new(vec![[1.9, 1.2], [5.0, 1.0], [5.0, 5.0], [1.9, 1.2]]);
        assert_eq!(ring.pixel_vertices(), vec![(1, 1), (5, 1), (5, 5)]);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Text.to_string(), "text");
        assert_eq!("sound".parse::<Category>().ok(), Some(Category::Sound));
    }
}
