use emath::Vec2;

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub viewport: Vec2,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: [1280.0, 860.0].into(),
        }
    }
}
