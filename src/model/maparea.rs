//! Hyperlink map-areas.
//!
//! A map-area record has the form
//!
//! ```text
//! (maparea URI COMMENT SHAPE OPTION...)
//! ```
//!
//! where `URI` is a string or `(url "uri" "target")`, `SHAPE` one of
//! `(rect x y w h)`, `(oval x y w h)`, `(poly x1 y1 ...)`, `(line x0 y0 x1 y1)`
//! or `(text x y w h)`, and each option a list `(key)` or `(key value)`.
//! Options equal to their defaults are not written back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use super::geometry::{Point, Rect, RectTransform};
use crate::error::{Error, Result};
use crate::sexpr::Expr;

static COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

pub const DEFAULT_OPACITY: u8 = 50;
pub const DEFAULT_LINE_WIDTH: u32 = 1;
pub const MIN_SHADOW_WIDTH: u8 = 1;
pub const MAX_SHADOW_WIDTH: u8 = 32;

/// An `#RRGGBB` color, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Color(String);

impl Color {
    pub fn parse(value: &str) -> Result<Self> {
        if COLOR.is_match(value) {
            Ok(Color(value.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidColor(value.to_string()))
        }
    }

    pub fn black() -> Self {
        Color("#000000".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn to_expr(&self) -> Expr {
        Expr::symbol(self.0.clone())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shadow border styles, allowed on rectangles only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowStyle {
    In,
    Out,
    EtchedIn,
    EtchedOut,
}

impl ShadowStyle {
    pub const ALL: [ShadowStyle; 4] = [
        ShadowStyle::In,
        ShadowStyle::Out,
        ShadowStyle::EtchedIn,
        ShadowStyle::EtchedOut,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            ShadowStyle::In => "shadow_in",
            ShadowStyle::Out => "shadow_out",
            ShadowStyle::EtchedIn => "shadow_ein",
            ShadowStyle::EtchedOut => "shadow_eout",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        ShadowStyle::ALL.into_iter().find(|s| s.symbol() == symbol)
    }
}

/// Map-area border.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Border {
    None,
    Xor,
    Solid(Color),
    Shadow { style: ShadowStyle, width: u8 },
}

impl Border {
    pub fn shadow(style: ShadowStyle, width: u8) -> Result<Self> {
        if !(MIN_SHADOW_WIDTH..=MAX_SHADOW_WIDTH).contains(&width) {
            return Err(Error::invalid(
                "shadow width",
                format!(
                    "{} is outside {}..={}",
                    width, MIN_SHADOW_WIDTH, MAX_SHADOW_WIDTH
                ),
            ));
        }
        Ok(Border::Shadow { style, width })
    }

    pub fn is_shadow(&self) -> bool {
        matches!(self, Border::Shadow { .. })
    }

    fn to_expr(&self) -> Expr {
        match self {
            Border::None => Expr::tagged("none", []),
            Border::Xor => Expr::tagged("xor", []),
            Border::Solid(color) => Expr::tagged("border", [color.to_expr()]),
            Border::Shadow { style, width } => {
                Expr::tagged(style.symbol(), [Expr::Int(i64::from(*width))])
            }
        }
    }
}

/// Shape discriminant, used when converting between shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Oval,
    Polygon,
    Line,
    Text,
}

impl ShapeKind {
    pub fn symbol(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rect",
            ShapeKind::Oval => "oval",
            ShapeKind::Polygon => "poly",
            ShapeKind::Line => "line",
            ShapeKind::Text => "text",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Oval => "oval",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Line => "line",
            ShapeKind::Text => "text",
        }
    }

    pub fn can_have_shadow_border(self) -> bool {
        self == ShapeKind::Rectangle
    }
}

/// Geometry plus shape-specific options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Rectangle {
        rect: Rect,
        highlight: Option<Color>,
        opacity: u8,
    },
    Oval {
        rect: Rect,
    },
    Polygon {
        points: Vec<Point>,
    },
    Line {
        from: Point,
        to: Point,
        width: u32,
        color: Color,
        arrow: bool,
    },
    Text {
        rect: Rect,
        background: Option<Color>,
        text_color: Color,
        pushpin: bool,
    },
}

impl Shape {
    pub fn rectangle(rect: Rect) -> Result<Self> {
        check_area(rect)?;
        Ok(Shape::Rectangle {
            rect,
            highlight: None,
            opacity: DEFAULT_OPACITY,
        })
    }

    pub fn oval(rect: Rect) -> Result<Self> {
        check_area(rect)?;
        Ok(Shape::Oval { rect })
    }

    pub fn polygon(points: Vec<Point>) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::invalid(
                "polygon",
                format!("needs at least 3 vertices, got {}", points.len()),
            ));
        }
        Ok(Shape::Polygon { points })
    }

    pub fn line(from: Point, to: Point) -> Self {
        Shape::Line {
            from,
            to,
            width: DEFAULT_LINE_WIDTH,
            color: Color::black(),
            arrow: false,
        }
    }

    pub fn text(rect: Rect) -> Result<Self> {
        check_area(rect)?;
        Ok(Shape::Text {
            rect,
            background: None,
            text_color: Color::black(),
            pushpin: false,
        })
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rectangle { .. } => ShapeKind::Rectangle,
            Shape::Oval { .. } => ShapeKind::Oval,
            Shape::Polygon { .. } => ShapeKind::Polygon,
            Shape::Line { .. } => ShapeKind::Line,
            Shape::Text { .. } => ShapeKind::Text,
        }
    }

    /// Bounding rectangle.
    pub fn rect(&self) -> Rect {
        match self {
            Shape::Rectangle { rect, .. } | Shape::Oval { rect } | Shape::Text { rect, .. } => *rect,
            Shape::Polygon { points } => Rect::bounding(points),
            Shape::Line { from, to, .. } => {
                let x0 = from.0.min(to.0);
                let y0 = from.1.min(to.1);
                Rect::new(x0, y0, (from.0 - to.0).abs(), (from.1 - to.1).abs())
            }
        }
    }

    /// Move and resize the shape so its bounding rectangle becomes `rect`.
    pub fn set_rect(&mut self, rect: Rect) -> Result<()> {
        match self {
            Shape::Rectangle { rect: r, .. } | Shape::Oval { rect: r } | Shape::Text { rect: r, .. } => {
                check_area(rect)?;
                *r = rect;
            }
            Shape::Polygon { points } => {
                let xform = RectTransform::new(Rect::bounding(points), rect);
                for point in points.iter_mut() {
                    *point = xform.apply(*point);
                }
            }
            Shape::Line { from, to, .. } => {
                let current = Rect::bounding(&[*from, *to]);
                let xform = RectTransform::new(current, rect);
                *from = xform.apply(*from);
                *to = xform.apply(*to);
            }
        }
        Ok(())
    }

    fn area_expr(&self) -> Expr {
        let coords: Vec<i64> = match self {
            Shape::Rectangle { rect, .. } | Shape::Oval { rect } | Shape::Text { rect, .. } => {
                vec![rect.x, rect.y, rect.w, rect.h]
            }
            Shape::Polygon { points } => points.iter().flat_map(|&(x, y)| [x, y]).collect(),
            Shape::Line { from, to, .. } => vec![from.0, from.1, to.0, to.1],
        };
        Expr::tagged(self.kind().symbol(), coords.into_iter().map(Expr::Int))
    }

    fn option_exprs(&self) -> Vec<Expr> {
        let mut options = Vec::new();
        match self {
            Shape::Rectangle {
                highlight, opacity, ..
            } => {
                if *opacity != DEFAULT_OPACITY {
                    options.push(Expr::tagged("opacity", [Expr::Int(i64::from(*opacity))]));
                }
                if let Some(color) = highlight {
                    options.push(Expr::tagged("hilite", [color.to_expr()]));
                }
            }
            Shape::Line {
                width, color, arrow, ..
            } => {
                if *arrow {
                    options.push(Expr::tagged("arrow", []));
                }
                if *width != DEFAULT_LINE_WIDTH {
                    options.push(Expr::tagged("width", [Expr::Int(i64::from(*width))]));
                }
                if *color != Color::black() {
                    options.push(Expr::tagged("lineclr", [color.to_expr()]));
                }
            }
            Shape::Text {
                background,
                text_color,
                pushpin,
                ..
            } => {
                if let Some(color) = background {
                    options.push(Expr::tagged("backclr", [color.to_expr()]));
                }
                if *text_color != Color::black() {
                    options.push(Expr::tagged("textclr", [text_color.to_expr()]));
                }
                if *pushpin {
                    options.push(Expr::tagged("pushpin", []));
                }
            }
            Shape::Oval { .. } | Shape::Polygon { .. } => {}
        }
        options
    }
}

fn check_area(rect: Rect) -> Result<()> {
    if rect.has_area() {
        Ok(())
    } else {
        Err(Error::invalid(
            "rectangle",
            format!("{}x{} has no area", rect.w, rect.h),
        ))
    }
}

/// A hyperlink area on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapArea {
    uri: String,
    target: Option<String>,
    comment: String,
    shape: Shape,
    border: Option<Border>,
    border_always_visible: bool,
}

impl MapArea {
    pub fn new(uri: impl Into<String>, shape: Shape) -> Self {
        Self {
            uri: uri.into(),
            target: None,
            comment: String::new(),
            shape,
            border: None,
            border_always_visible: false,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn border(&self) -> Option<&Border> {
        self.border.as_ref()
    }

    pub fn border_always_visible(&self) -> bool {
        self.border_always_visible
    }

    pub fn rect(&self) -> Rect {
        self.shape.rect()
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
    }

    pub fn set_target(&mut self, target: Option<String>) {
        self.target = target;
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn set_rect(&mut self, rect: Rect) -> Result<()> {
        self.shape.set_rect(rect)
    }

    /// Set the border. Shadow borders are rejected on every shape except
    /// rectangles.
    pub fn set_border(&mut self, border: Option<Border>) -> Result<()> {
        if let Some(border) = &border {
            if border.is_shadow() && !self.kind().can_have_shadow_border() {
                return Err(Error::ShadowBorderNotAllowed {
                    shape: self.kind().name(),
                });
            }
        }
        self.border = border;
        Ok(())
    }

    pub fn set_border_always_visible(&mut self, visible: bool) -> Result<()> {
        if self.kind() == ShapeKind::Line {
            return Err(Error::invalid(
                "border_avis",
                "line map-areas have no always-visible border",
            ));
        }
        self.border_always_visible = visible;
        Ok(())
    }

    fn mismatch(&self, field: &'static str) -> Error {
        Error::invalid(field, format!("not supported by {} map-areas", self.kind().name()))
    }

    pub fn set_highlight_color(&mut self, color: Option<Color>) -> Result<()> {
        match &mut self.shape {
            Shape::Rectangle { highlight, .. } => {
                *highlight = color;
                Ok(())
            }
            _ => Err(self.mismatch("hilite")),
        }
    }

    pub fn set_opacity(&mut self, value: u8) -> Result<()> {
        if value > 100 {
            return Err(Error::invalid("opacity", format!("{} is outside 0..=100", value)));
        }
        match &mut self.shape {
            Shape::Rectangle { opacity, .. } => {
                *opacity = value;
                Ok(())
            }
            _ => Err(self.mismatch("opacity")),
        }
    }

    pub fn set_line_width(&mut self, value: u32) -> Result<()> {
        if value < DEFAULT_LINE_WIDTH {
            return Err(Error::invalid("width", "line width must be at least 1"));
        }
        match &mut self.shape {
            Shape::Line { width, .. } => {
                *width = value;
                Ok(())
            }
            _ => Err(self.mismatch("width")),
        }
    }

    pub fn set_line_color(&mut self, value: Color) -> Result<()> {
        match &mut self.shape {
            Shape::Line { color, .. } => {
                *color = value;
                Ok(())
            }
            _ => Err(self.mismatch("lineclr")),
        }
    }

    pub fn set_line_arrow(&mut self, value: bool) -> Result<()> {
        match &mut self.shape {
            Shape::Line { arrow, .. } => {
                *arrow = value;
                Ok(())
            }
            _ => Err(self.mismatch("arrow")),
        }
    }

    pub fn set_background_color(&mut self, value: Option<Color>) -> Result<()> {
        match &mut self.shape {
            Shape::Text { background, .. } => {
                *background = value;
                Ok(())
            }
            _ => Err(self.mismatch("backclr")),
        }
    }

    pub fn set_text_color(&mut self, value: Color) -> Result<()> {
        match &mut self.shape {
            Shape::Text { text_color, .. } => {
                *text_color = value;
                Ok(())
            }
            _ => Err(self.mismatch("textclr")),
        }
    }

    pub fn set_pushpin(&mut self, value: bool) -> Result<()> {
        match &mut self.shape {
            Shape::Text { pushpin, .. } => {
                *pushpin = value;
                Ok(())
            }
            _ => Err(self.mismatch("pushpin")),
        }
    }

    /// Build a map-area of shape `kind`, carrying over the common fields and
    /// bounding rectangle of `previous`. Without a previous area the shape is
    /// a small rectangle at the origin. A shadow border is dropped when the
    /// new shape cannot have one.
    pub fn from_draft(previous: Option<&MapArea>, kind: ShapeKind) -> MapArea {
        let rect = previous
            .map(MapArea::rect)
            .filter(Rect::has_area)
            .unwrap_or_else(|| Rect::new(0, 0, 32, 32));
        let shape = match kind {
            ShapeKind::Rectangle => Shape::Rectangle {
                rect,
                highlight: None,
                opacity: DEFAULT_OPACITY,
            },
            ShapeKind::Oval => Shape::Oval { rect },
            ShapeKind::Polygon => Shape::Polygon {
                points: vec![
                    (rect.x, rect.y),
                    (rect.x1(), rect.y),
                    (rect.x1(), rect.y1()),
                    (rect.x, rect.y1()),
                ],
            },
            ShapeKind::Line => Shape::line((rect.x, rect.y), (rect.x1(), rect.y1())),
            ShapeKind::Text => Shape::Text {
                rect,
                background: None,
                text_color: Color::black(),
                pushpin: false,
            },
        };
        let mut area = MapArea::new("", shape);
        if let Some(previous) = previous {
            area.uri = previous.uri.clone();
            area.target = previous.target.clone();
            area.comment = previous.comment.clone();
            area.border = previous
                .border
                .clone()
                .filter(|b| !b.is_shadow() || kind.can_have_shadow_border());
            if kind != ShapeKind::Line {
                area.border_always_visible = previous.border_always_visible;
            }
        }
        area
    }

    pub fn to_expr(&self) -> Expr {
        let uri = match &self.target {
            Some(target) => Expr::tagged(
                "url",
                [Expr::string(self.uri.clone()), Expr::string(target.clone())],
            ),
            None => Expr::string(self.uri.clone()),
        };
        let mut items = vec![
            Expr::symbol("maparea"),
            uri,
            Expr::string(self.comment.clone()),
            self.shape.area_expr(),
        ];
        if let Some(border) = &self.border {
            items.push(border.to_expr());
        }
        if self.border_always_visible {
            items.push(Expr::tagged("border_avis", []));
        }
        items.extend(self.shape.option_exprs());
        Expr::List(items)
    }

    pub fn from_expr(expr: &Expr) -> Result<Self> {
        let items = match expr.as_list() {
            Some(items) if expr.head_symbol() == Some("maparea") => items,
            _ => return Err(syntax(format!("not a maparea record: {}", expr))),
        };
        let [_, uri, comment, area, options @ ..] = items else {
            return Err(syntax(format!("maparea record is too short: {}", expr)));
        };
        let (uri, target) = parse_uri(uri)?;
        let comment = comment
            .as_str()
            .ok_or_else(|| syntax(format!("comment must be a string, found {}", comment)))?
            .to_string();
        let mut shape = parse_area(area)?;
        let mut border = None;
        let mut border_always_visible = false;
        let kind = shape.kind();
        for option in options {
            let option_items = option
                .as_list()
                .filter(|items| !items.is_empty())
                .ok_or_else(|| syntax(format!("invalid option {}", option)))?;
            let key = option_items[0]
                .as_symbol()
                .ok_or_else(|| syntax(format!("invalid option {}", option)))?;
            let args = &option_items[1..];
            match key {
                "none" => border = Some(Border::None),
                "xor" => border = Some(Border::Xor),
                "border" => border = Some(Border::Solid(color_arg(key, args)?)),
                "border_avis" if kind != ShapeKind::Line => border_always_visible = true,
                _ => {
                    if let Some(style) = ShadowStyle::from_symbol(key).filter(|_| kind.can_have_shadow_border()) {
                        let width = int_arg(key, args)?;
                        let width = u8::try_from(width).map_err(|_| syntax(format!("bad shadow width {}", width)))?;
                        border = Some(Border::shadow(style, width).map_err(|e| syntax(e.to_string()))?);
                    } else {
                        parse_shape_option(&mut shape, key, args)?;
                    }
                }
            }
        }
        Ok(MapArea {
            uri,
            target,
            comment,
            shape,
            border,
            border_always_visible,
        })
    }
}

fn syntax(message: String) -> Error {
    Error::MapAreaSyntax(message)
}

fn parse_uri(expr: &Expr) -> Result<(String, Option<String>)> {
    if let Some(uri) = expr.as_str() {
        return Ok((uri.to_string(), None));
    }
    match expr.as_list() {
        Some([head, Expr::Str(uri), Expr::Str(target)]) if head.is_symbol("url") => {
            Ok((uri.clone(), Some(target.clone())))
        }
        _ => Err(syntax(format!("invalid uri {}", expr))),
    }
}

fn coords(items: &[Expr]) -> Result<Vec<i64>> {
    items
        .iter()
        .map(|item| {
            item.as_int()
                .ok_or_else(|| syntax(format!("bad coordinate {}", item)))
        })
        .collect()
}

fn parse_area(expr: &Expr) -> Result<Shape> {
    let items = expr
        .as_list()
        .ok_or_else(|| syntax(format!("invalid shape {}", expr)))?;
    let symbol = expr
        .head_symbol()
        .ok_or_else(|| syntax(format!("invalid shape {}", expr)))?;
    let values = coords(&items[1..])?;
    let to_syntax = |e: Error| syntax(e.to_string());
    match (symbol, values.as_slice()) {
        ("rect", &[x, y, w, h]) => Shape::rectangle(Rect::new(x, y, w, h)).map_err(to_syntax),
        ("oval", &[x, y, w, h]) => Shape::oval(Rect::new(x, y, w, h)).map_err(to_syntax),
        ("text", &[x, y, w, h]) => Shape::text(Rect::new(x, y, w, h)).map_err(to_syntax),
        ("line", &[x0, y0, x1, y1]) => Ok(Shape::line((x0, y0), (x1, y1))),
        ("poly", values) => {
            if values.len() % 2 != 0 {
                return Err(syntax("polygon has an odd number of coordinates".to_string()));
            }
            let points = values.chunks(2).map(|c| (c[0], c[1])).collect();
            Shape::polygon(points).map_err(to_syntax)
        }
        _ => Err(syntax(format!("invalid shape {}", expr))),
    }
}

fn int_arg(key: &str, args: &[Expr]) -> Result<i64> {
    match args {
        [value] => value
            .as_int()
            .ok_or_else(|| syntax(format!("({} ...) needs an integer", key))),
        _ => Err(syntax(format!("({} ...) needs one argument", key))),
    }
}

fn color_arg(key: &str, args: &[Expr]) -> Result<Color> {
    let value = match args {
        [Expr::Symbol(s)] | [Expr::Str(s)] => s,
        _ => return Err(syntax(format!("({} ...) needs a color", key))),
    };
    Color::parse(value).map_err(|e| syntax(e.to_string()))
}

fn flag_arg(key: &str, args: &[Expr]) -> Result<bool> {
    if args.is_empty() {
        Ok(true)
    } else {
        Err(syntax(format!("({}) takes no arguments", key)))
    }
}

fn parse_shape_option(shape: &mut Shape, key: &str, args: &[Expr]) -> Result<()> {
    let kind = shape.kind();
    match (shape, key) {
        (Shape::Rectangle { highlight, .. }, "hilite") => *highlight = Some(color_arg(key, args)?),
        (Shape::Rectangle { opacity, .. }, "opacity") => {
            let value = int_arg(key, args)?;
            *opacity = u8::try_from(value)
                .ok()
                .filter(|v| *v <= 100)
                .ok_or_else(|| syntax(format!("opacity {} is outside 0..=100", value)))?;
        }
        (Shape::Line { arrow, .. }, "arrow") => *arrow = flag_arg(key, args)?,
        (Shape::Line { width, .. }, "width") => {
            let value = int_arg(key, args)?;
            *width = u32::try_from(value)
                .ok()
                .filter(|v| *v >= DEFAULT_LINE_WIDTH)
                .ok_or_else(|| syntax(format!("line width {} is below 1", value)))?;
        }
        (Shape::Line { color, .. }, "lineclr") => *color = color_arg(key, args)?,
        (Shape::Text { background, .. }, "backclr") => *background = Some(color_arg(key, args)?),
        (Shape::Text { text_color, .. }, "textclr") => *text_color = color_arg(key, args)?,
        (Shape::Text { pushpin, .. }, "pushpin") => *pushpin = flag_arg(key, args)?,
        _ => {
            return Err(syntax(format!(
                "{:?} is invalid option for {} annotations",
                key,
                kind.name()
            )))
        }
    }
    Ok(())
}
