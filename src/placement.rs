//! Object-fit / object-position geometry
//!
//! Maps a frame image onto a container rectangle the way CSS `object-fit`
//! and `object-position` do: a fit mode picks the render size, a 1- or
//! 2-token position spec distributes the free space. Pure math over
//! `glam::Vec2`; the only state is the cached container size.
//!
//! Offsets may be negative and sizes may exceed the container (`cover`,
//! `none` overflow) — callers clip at draw time.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CSS-equivalent fit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFit {
    Fill,
    Contain,
    Cover,
    None,
    ScaleDown,
}

impl FromStr for ObjectFit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fill" => Ok(ObjectFit::Fill),
            "contain" => Ok(ObjectFit::Contain),
            "cover" => Ok(ObjectFit::Cover),
            "none" => Ok(ObjectFit::None),
            "scale-down" => Ok(ObjectFit::ScaleDown),
            other => Err(format!("unknown object-fit: {}", other)),
        }
    }
}

/// One parsed object-position token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionValue {
    Left,
    Right,
    Top,
    Bottom,
    Center,
    /// Percentage of the free space along the axis.
    Percent(f32),
    /// Verbatim pixel offset, not scaled by free space.
    Px(f32),
}

impl PositionValue {
    /// Offset into `free` space (container minus render size) on one axis.
    fn offset(self, free: f32) -> f32 {
        let pct = match self {
            PositionValue::Left | PositionValue::Top => 0.0,
            PositionValue::Right | PositionValue::Bottom => 100.0,
            PositionValue::Center => 50.0,
            PositionValue::Percent(p) => p,
            PositionValue::Px(px) => return px,
        };
        free * pct / 100.0
    }
}

impl FromStr for PositionValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Tokens arrive whitespace-insensitive ("50 %" == "50%").
        let s = s.replace(' ', "");
        match s.as_str() {
            "left" => return Ok(PositionValue::Left),
            "right" => return Ok(PositionValue::Right),
            "top" => return Ok(PositionValue::Top),
            "bottom" => return Ok(PositionValue::Bottom),
            "center" => return Ok(PositionValue::Center),
            _ => {}
        }

        if let Some(px) = s.strip_suffix("px") {
            return match px.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(PositionValue::Px(v)),
                _ => Err(format!("bad px offset: {}", s)),
            };
        }

        // Bare numbers count as percentages, with or without the suffix.
        let pct = s.strip_suffix('%').unwrap_or(&s);
        match pct.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(PositionValue::Percent(v)),
            _ => Err(format!("bad position value: {}", s)),
        }
    }
}

/// Destination rectangle in container coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Render size for an object of `object` size in `container` under `fit`.
pub fn fit_size(object: Vec2, container: Vec2, fit: ObjectFit) -> Vec2 {
    let obj_ratio = object.x / object.y;
    let container_ratio = container.x / container.y;

    match fit {
        ObjectFit::Fill => container,
        ObjectFit::Contain => {
            if obj_ratio > container_ratio {
                Vec2::new(container.x, container.x / obj_ratio)
            } else {
                Vec2::new(container.y * obj_ratio, container.y)
            }
        }
        ObjectFit::Cover => {
            if obj_ratio > container_ratio {
                Vec2::new(container.y * obj_ratio, container.y)
            } else {
                Vec2::new(container.x, container.x / obj_ratio)
            }
        }
        ObjectFit::None => object,
        ObjectFit::ScaleDown => {
            if object.x <= container.x && object.y <= container.y {
                object
            } else {
                fit_size(object, container, ObjectFit::Contain)
            }
        }
    }
}

/// Top-left offset for a rendered size inside the container, or `None`
/// when any token fails to parse.
pub fn position_offset(render: Vec2, container: Vec2, position: &[String]) -> Option<Vec2> {
    let mut tokens: Vec<String> = position.iter().map(|t| t.replace(' ', "")).collect();

    // A single vertical keyword gets a centered X, anything else a centered Y.
    if tokens.len() == 1 {
        if tokens[0] == "top" || tokens[0] == "bottom" {
            tokens.insert(0, "center".to_string());
        } else {
            tokens.push("center".to_string());
        }
    }

    let x = tokens.first()?.parse::<PositionValue>().ok()?;
    let y = tokens.get(1)?.parse::<PositionValue>().ok()?;

    Some(Vec2::new(
        x.offset(container.x - render.x),
        y.offset(container.y - render.y),
    ))
}

/// Placement calculator with a cached container size.
#[derive(Debug, Clone, Default)]
pub struct ObjectPlacement {
    container: Vec2,
}

impl ObjectPlacement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_container(&mut self, container: Vec2) {
        self.container = container;
    }

    pub fn container(&self) -> Vec2 {
        self.container
    }

    /// Full placement for an object under the cached container.
    pub fn calc(&self, object: Vec2, fit: ObjectFit, position: &[String]) -> Option<Placement> {
        let render = fit_size(object, self.container, fit);
        let offset = position_offset(render, self.container, position)?;
        Some(Placement {
            x: offset.x,
            y: offset.y,
            width: render.x,
            height: render.y,
        })
    }
}
