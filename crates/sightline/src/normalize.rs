//! Option normalization applied right before dispatch.
//!
//! Two independent passes, both pure:
//! - timeout defaulting fills in `LocatorConfig::action_timeout` when the
//!   caller gave none, and never overrides an explicit timeout;
//! - iframe coordinate scaling multiplies every position-like field by the
//!   tester iframe's rendering scale. The scale is looked up at most once per
//!   normalization call through a [`ScaleCache`] that lives only for that
//!   call.

use std::fmt;

use tracing::trace;

use crate::config::LocatorConfig;
use crate::dom::Document;
use crate::options::{
    millis, ActionOptions, ClickOptions, DragAndDropOptions, DriverDragOptions,
    DriverPointerOptions, HoverOptions, NativeOptions, PlainOptions, Position,
    SessionClickOptions, SessionDragOptions, SessionHoverOptions, TimeoutOption,
};
use crate::result::{LocatorError, LocatorResult};

/// Id of the iframe that hosts the tests when the UI overlay is active
pub const TESTER_ELEMENT_ID: &str = "vitest-tester";

/// Attribute on the tester iframe holding its rendering scale
pub const SCALE_ATTRIBUTE: &str = "data-scale";

/// Where the iframe rendering scale comes from
pub trait ScaleSource: Send + Sync + fmt::Debug {
    /// Ratio of rendered size to intrinsic content size
    fn scale(&self) -> LocatorResult<f64>;
}

/// A constant scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScale(pub f64);

impl Default for FixedScale {
    fn default() -> Self {
        Self(1.0)
    }
}

impl ScaleSource for FixedScale {
    fn scale(&self) -> LocatorResult<f64> {
        Ok(self.0)
    }
}

/// Scale from the rendered and intrinsic widths of the iframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    /// Width the iframe is drawn at
    pub rendered_width: f64,
    /// Width of the iframe's content viewport
    pub intrinsic_width: f64,
}

impl ScaleSource for FrameGeometry {
    fn scale(&self) -> LocatorResult<f64> {
        if self.intrinsic_width <= 0.0 || !self.intrinsic_width.is_finite() {
            return Err(LocatorError::ScaleUnavailable {
                message: format!("intrinsic width {} is not positive", self.intrinsic_width),
            });
        }
        Ok(self.rendered_width / self.intrinsic_width)
    }
}

/// Scale read from the `data-scale` attribute of the tester iframe in the
/// host document
#[derive(Debug, Clone)]
pub struct TesterElementScale {
    host: Document,
    element_id: String,
}

impl TesterElementScale {
    /// Read the scale from `#vitest-tester` in `host`
    #[must_use]
    pub fn new(host: Document) -> Self {
        Self {
            host,
            element_id: TESTER_ELEMENT_ID.to_string(),
        }
    }

    /// Read the scale from a differently named element
    #[must_use]
    pub fn with_element_id(mut self, id: impl Into<String>) -> Self {
        self.element_id = id.into();
        self
    }
}

impl ScaleSource for TesterElementScale {
    fn scale(&self) -> LocatorResult<f64> {
        let element = self.host.get_element_by_id(&self.element_id).ok_or_else(|| {
            LocatorError::ScaleUnavailable {
                message: format!("cannot find #{} element", self.element_id),
            }
        })?;
        let raw = element.attribute(SCALE_ATTRIBUTE).unwrap_or_default();
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|scale| scale.is_finite())
            .ok_or_else(|| LocatorError::ScaleUnavailable {
                message: format!(
                    "{SCALE_ATTRIBUTE} of #{} is not a number: {raw:?}",
                    self.element_id
                ),
            })
    }
}

/// Memoizes one scale lookup for the duration of a single normalization call
#[derive(Debug)]
pub struct ScaleCache<'a> {
    source: &'a dyn ScaleSource,
    scale: Option<f64>,
}

impl<'a> ScaleCache<'a> {
    /// Empty cache over `source`
    #[must_use]
    pub fn new(source: &'a dyn ScaleSource) -> Self {
        Self {
            source,
            scale: None,
        }
    }

    /// The scale, computed on first use
    pub fn get(&mut self) -> LocatorResult<f64> {
        if let Some(scale) = self.scale {
            return Ok(scale);
        }
        let scale = self.source.scale()?;
        trace!(scale, "computed iframe scale");
        self.scale = Some(scale);
        Ok(scale)
    }

    fn position(&mut self, position: Option<Position>) -> LocatorResult<Option<Position>> {
        position.map(|p| Ok(p.scaled(self.get()?))).transpose()
    }

    /// Scaled and rounded half toward positive infinity
    fn rounded(&mut self, coordinate: Option<f64>) -> LocatorResult<Option<f64>> {
        coordinate
            .map(|c| Ok((c * self.get()? + 0.5).floor()))
            .transpose()
    }
}

/// Fill in the configured default timeout
#[must_use]
pub fn with_default_timeout<T: TimeoutOption>(options: T, config: &LocatorConfig) -> T {
    match (options.timeout(), config.action_timeout) {
        (None, Some(default)) => options.with_timeout(default),
        _ => options,
    }
}

fn driver_pointer(
    position: Option<Position>,
    timeout: Option<std::time::Duration>,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let mut cache = ScaleCache::new(scale);
    Ok(NativeOptions::DriverPointer(DriverPointerOptions {
        position: cache.position(position)?,
        timeout: millis(timeout),
    }))
}

/// Remote-driver click options: timeout defaulting plus unrounded position
/// scaling
pub fn driver_click(
    options: &ClickOptions,
    config: &LocatorConfig,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let options = with_default_timeout(*options, config);
    driver_pointer(options.position, options.timeout, scale)
}

/// Remote-driver hover options
pub fn driver_hover(
    options: &HoverOptions,
    config: &LocatorConfig,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let options = with_default_timeout(*options, config);
    driver_pointer(options.position, options.timeout, scale)
}

/// Remote-driver drag-and-drop options
pub fn driver_drag(
    options: &DragAndDropOptions,
    config: &LocatorConfig,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let options = with_default_timeout(*options, config);
    let mut cache = ScaleCache::new(scale);
    Ok(NativeOptions::DriverDrag(DriverDragOptions {
        source_position: cache.position(options.source_position)?,
        target_position: cache.position(options.target_position)?,
        timeout: millis(options.timeout),
    }))
}

/// Remote-driver options for actions without coordinates
#[must_use]
pub fn driver_plain(options: &ActionOptions, config: &LocatorConfig) -> NativeOptions {
    let options = with_default_timeout(*options, config);
    NativeOptions::Plain(PlainOptions {
        timeout: millis(options.timeout),
    })
}

/// Remote-session click options: `x`/`y`, rounded, scaled only under the
/// UI overlay
pub fn session_click(
    options: &ClickOptions,
    config: &LocatorConfig,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let (x, y) = split(options.position);
    let (x, y) = if config.ui_overlay {
        let mut cache = ScaleCache::new(scale);
        (cache.rounded(x)?, cache.rounded(y)?)
    } else {
        (x, y)
    };
    Ok(NativeOptions::SessionClick(SessionClickOptions {
        x,
        y,
        timeout: millis(options.timeout),
    }))
}

/// Remote-session hover options: `xOffset`/`yOffset`
pub fn session_hover(
    options: &HoverOptions,
    config: &LocatorConfig,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let (x, y) = split(options.position);
    let (x_offset, y_offset) = if config.ui_overlay {
        let mut cache = ScaleCache::new(scale);
        (cache.rounded(x)?, cache.rounded(y)?)
    } else {
        (x, y)
    };
    Ok(NativeOptions::SessionHover(SessionHoverOptions {
        x_offset,
        y_offset,
        timeout: millis(options.timeout),
    }))
}

/// Remote-session drag options: `sourceX`/`sourceY`/`targetX`/`targetY`
pub fn session_drag(
    options: &DragAndDropOptions,
    config: &LocatorConfig,
    scale: &dyn ScaleSource,
) -> LocatorResult<NativeOptions> {
    let (source_x, source_y) = split(options.source_position);
    let (target_x, target_y) = split(options.target_position);
    let mut drag = SessionDragOptions {
        source_x,
        source_y,
        target_x,
        target_y,
        timeout: millis(options.timeout),
    };
    if config.ui_overlay {
        let mut cache = ScaleCache::new(scale);
        drag.source_x = cache.rounded(drag.source_x)?;
        drag.source_y = cache.rounded(drag.source_y)?;
        drag.target_x = cache.rounded(drag.target_x)?;
        drag.target_y = cache.rounded(drag.target_y)?;
    }
    Ok(NativeOptions::SessionDrag(drag))
}

/// Remote-session options for actions without coordinates
#[must_use]
pub fn session_plain(options: &ActionOptions) -> NativeOptions {
    NativeOptions::Plain(PlainOptions {
        timeout: millis(options.timeout),
    })
}

fn split(position: Option<Position>) -> (Option<f64>, Option<f64>) {
    position.map_or((None, None), |p| (Some(p.x), Some(p.y)))
}
