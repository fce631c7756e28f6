use std::io::Cursor;

use crate::{
    config::PipelineConfig,
    error::MaskError,
    manager::{SessionCommand, SessionController},
    typed_geojson::RegionProperties,
    types::{Category, ImageDimensions},
};
use base64::Engine;
use image::ImageFormat;
use rmcp::{
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo}, schemars, tool, Error as McpError, ServerHandler
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

type ToolResult = Result<CallToolResult, McpError>;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadImageRequest {
    #[schemars(description = "Path to the panel image file")]
    pub path: String,
    #[schemars(description = "Optional GeoJSON file with precomputed detections")]
    pub detections: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetCategoryRequest {
    #[schemars(description = "Region category: text or sound")]
    pub category: Category,
    #[schemars(description = "Whether the category contributes to the mask")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CategoryRequest {
    #[schemars(description = "Region category: text or sound")]
    pub category: Category,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPaddingRequest {
    #[schemars(description = "Region category: text or sound")]
    pub category: Category,
    #[schemars(description = "Square dilation kernel size in pixels", range(max = 200))]
    pub radius: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveImageRequest {
    #[schemars(description = "Output path ending in .png, .jpg or .jpeg")]
    pub path: String,
}

/// Detected regions of the loaded image
#[derive(Debug, Serialize, schemars::JsonSchema, TS)]
#[ts(export)]
pub struct DetectionsResponse {
    #[schemars(description = "Number of text boxes")]
    pub text_count: usize,
    #[schemars(description = "Number of sound effect polygons")]
    pub sound_count: usize,
    #[schemars(description = "Original image dimensions")]
    pub image_dimensions: ImageDimensions,
    #[schemars(description = "Largest detected region, if any")]
    pub largest_region: Option<RegionProperties>,
    #[schemars(description = "GeoJSON FeatureCollection of the detected regions")]
    #[ts(type = "unknown")]
    pub geojson: serde_json::Value,
}

fn success<T: Serialize + std::fmt::Debug>(value: &T) -> ToolResult {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_else(|_| format!("{:?}", value)),
    )]))
}

fn failure(error: MaskError) -> ToolResult {
    let message = if error.is_stale() {
        format!("Superseded by a newer request: {}", error)
    } else {
        error.to_string()
    };
    Ok(CallToolResult::error(vec![Content::text(message)]))
}

fn respond<T: Serialize + std::fmt::Debug>(result: crate::Result<T>) -> ToolResult {
    match result {
        Ok(value) => success(&value),
        Err(e) => failure(e),
    }
}

/// MCP server driving a single panel-cleaning session
#[derive(Clone)]
pub struct PanelMcpServer {
    controller: SessionController,
}

impl PanelMcpServer {
    pub fn new(controller: SessionController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    fn detections_response(&self) -> crate::Result<DetectionsResponse> {
        let (detections, dims) = self.controller.detections().ok_or(MaskError::NoImageLoaded)?;
        let typed = detections.to_typed_geojson(dims)?;
        Ok(DetectionsResponse {
            text_count: typed.features_in(Category::Text).len(),
            sound_count: typed.features_in(Category::Sound).len(),
            image_dimensions: dims,
            largest_region: typed.largest_feature().and_then(|feature| feature.properties()),
            geojson: serde_json::to_value(detections.to_geojson(dims)?)?,
        })
    }
}

impl Default for PanelMcpServer {
    fn default() -> Self {
        Self::new(SessionController::from_config(&PipelineConfig::default()))
    }
}

#[tool(tool_box)]
impl PanelMcpServer {
    #[tool(description = "Load a panel image, detect text and sound effects, and build the mask preview")]
    async fn load_image(&self, #[tool(aggr)] LoadImageRequest { path, detections }: LoadImageRequest) -> ToolResult {
        let command = match detections {
            Some(detections) => SessionCommand::LoadDetections { image: path, detections },
            None => SessionCommand::LoadImage { path },
        };
        respond(self.controller.execute(command).await)
    }

    #[tool(description = "Enable or disable a region category in the combined mask")]
    fn set_category(&self, #[tool(aggr)] SetCategoryRequest { category, enabled }: SetCategoryRequest) -> ToolResult {
        respond(self.controller.set_category(category, enabled))
    }

    #[tool(description = "Flip whether a region category contributes to the combined mask")]
    fn toggle_category(&self, #[tool(aggr)] CategoryRequest { category }: CategoryRequest) -> ToolResult {
        respond(self.controller.toggle(category))
    }

    #[tool(description = "Set how many pixels a category's regions are grown before removal")]
    fn set_padding(&self, #[tool(aggr)] SetPaddingRequest { category, radius }: SetPaddingRequest) -> ToolResult {
        respond(self.controller.set_category_padding(category, radius))
    }

    #[tool(description = "Inpaint every pixel of the combined mask")]
    async fn remove_regions(&self) -> ToolResult {
        respond(self.controller.execute(SessionCommand::RemoveRegions).await)
    }

    #[tool(description = "Save the displayed image (inpainted result if present, otherwise the preview)")]
    fn save_image(&self, #[tool(aggr)] SaveImageRequest { path }: SaveImageRequest) -> ToolResult {
        respond(self.controller.save(&path).map(|()| format!("Saved image to {}", path)))
    }

    #[tool(description = "Get the current session state")]
    fn get_status(&self) -> ToolResult {
        success(&self.controller.status())
    }

    #[tool(description = "Get the detected regions of the loaded image as GeoJSON")]
    fn get_detections(&self) -> ToolResult {
        respond(self.detections_response())
    }

    #[tool(description = "Get the displayed image as a PNG")]
    fn get_preview(&self) -> ToolResult {
        let Some(image) = self.controller.displayed_image() else {
            return failure(MaskError::NoImageLoaded);
        };
        let mut bytes = Vec::new();
        if let Err(e) = image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png) {
            return failure(MaskError::ImageWrite(e));
        }
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(CallToolResult::success(vec![Content::image(data, "image/png")]))
    }

    #[tool(description = "Get information about available commands and their parameters")]
    fn get_command_info(&self) -> String {
        let mut info = String::new();
        info.push_str("Available SessionCommands:\n\n");

        for (i, name) in SessionCommand::command_names().iter().enumerate() {
            info.push_str(&format!("{}. {}\n", i + 1, name));
        }

        info.push_str("\nCommand Details:\n");
        for cmd in SessionCommand::examples() {
            info.push_str(&format!("\n- {}\n", cmd));
            info.push_str(&format!("  Description: {}\n", cmd.description()));

            let params = cmd.parameters_info();
            if !params.is_empty() {
                info.push_str("  Parameters:\n");
                for (name, desc, required) in params {
                    let req_marker = if required { " (required)" } else { " (optional)" };
                    info.push_str(&format!("    - {}{}: {}\n", name, req_marker, desc));
                }
            }
        }

        info
    }

    #[tool(description = "Get the JSON schema for SessionCommand")]
    fn get_command_schema(&self) -> String {
        let schema = SessionCommand::schema();
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for PanelMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Comic Panel Cleaning Server - Detect text boxes and sound effects in a panel, tune per-category padding and selection, preview the combined mask in red and inpaint the masked regions.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::{
        config::ArtifactConfig,
        types::{BoxRegion, BoxSet, Detections, PolygonSet},
    };

    fn server() -> PanelMcpServer {
        let config = PipelineConfig { artifacts: ArtifactConfig::disabled(), ..PipelineConfig::default() };
        PanelMcpServer::new(SessionController::from_config(&config))
    }

    #[test]
    fn test_detections_require_an_image() {
        assert!(matches!(server().detections_response(), Err(MaskError::NoImageLoaded)));
    }

    #[test]
    fn test_detections_response_counts_regions() {
        let server = server();
        let detections = Detections::new(
            BoxSet::new(vec![BoxRegion::new(1.0, 1.0, 5.0, 5.0), BoxRegion::new(8.0, 8.0, 12.0, 12.0)]),
            PolygonSet::default(),
        );
        server
            .controller()
            .load_with_detections(RgbImage::from_pixel(20, 20, Rgb([9, 9, 9])), detections.clone(), None)
            .unwrap();

        let response = server.detections_response().unwrap();
        assert_eq!((response.text_count, response.sound_count), (2, 0));
        assert_eq!(response.image_dimensions, ImageDimensions { width: 20, height: 20 });
        assert_eq!(response.largest_region.map(|region| region.category), Some(Category::Text));

        assert_eq!(response.geojson["type"], "FeatureCollection");
        assert_eq!(response.geojson["image_width"], 20);
        let restored = Detections::from_geojson_string(&response.geojson.to_string()).unwrap();
        assert_eq!(restored, detections);
    }

    #[test]
    fn test_command_info_lists_every_command() {
        let info = server().get_command_info();
        for name in SessionCommand::command_names() {
            assert!(info.contains(name), "missing {name}");
        }
    }
}
