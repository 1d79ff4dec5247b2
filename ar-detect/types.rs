/// Local maximum of the corner response, in level pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCorner {
    pub x: usize,
    pub y: usize,
    pub response: f32,
}

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}
