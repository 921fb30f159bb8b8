//! DOM-backed geometry, scroll container and text-selection lock.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, ScrollBehavior, ScrollToOptions};

use crate::autoscroll::ScrollContainer;
use crate::controller::GridHost;
use crate::geometry::GeometryProvider;
use crate::types::{CellGeometry, Rect};

/// Attribute that marks the element to scroll, overriding overflow detection.
pub const SCROLL_MARKER: &str = "data-grid-scroll";
const CELL_SELECTOR: &str = "[data-row-id][data-column-id]";

/// Reads cell boxes from elements carrying `data-row-id` and `data-column-id`.
pub struct DomGeometry {
    surface: Element,
}

impl DomGeometry {
    pub fn new(surface: Element) -> Self {
        Self { surface }
    }
}

impl GeometryProvider for DomGeometry {
    fn cells_info(&self) -> Vec<CellGeometry> {
        let Ok(nodes) = self.surface.query_selector_all(CELL_SELECTOR) else {
            return Vec::new();
        };
        let mut cells = Vec::with_capacity(usize::try_from(nodes.length()).unwrap_or(0));
        for i in 0..nodes.length() {
            let Some(el) = nodes.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let (Some(row_id), Some(column_id)) =
                (el.get_attribute("data-row-id"), el.get_attribute("data-column-id"))
            else {
                continue;
            };
            let r = el.get_bounding_client_rect();
            cells.push(CellGeometry::new(
                row_id,
                column_id,
                Rect::new(r.left(), r.top(), r.width(), r.height()),
            ));
        }
        cells
    }
}

/// The element that scrolls the grid.
pub struct DomScrollContainer {
    element: Element,
    /// The document scrolling element; its visible box is the viewport.
    is_document: bool,
}

impl DomScrollContainer {
    /// Find the container for `surface`: the nearest ancestor-or-self with
    /// [`SCROLL_MARKER`], else the nearest with `overflow` (or `-x`/`-y`) of
    /// `auto` or `scroll`, else the document scrolling element.
    pub fn resolve(surface: &Element) -> Option<Self> {
        let window = web_sys::window()?;

        let mut current = Some(surface.clone());
        while let Some(el) = current {
            if el.has_attribute(SCROLL_MARKER) {
                return Some(Self::element(el));
            }
            current = el.parent_element();
        }

        let mut current = Some(surface.clone());
        while let Some(el) = current {
            if let Ok(Some(style)) = window.get_computed_style(&el) {
                let scrolls = ["overflow", "overflow-x", "overflow-y"].iter().any(|prop| {
                    matches!(
                        style.get_property_value(prop).as_deref(),
                        Ok("auto" | "scroll")
                    )
                });
                if scrolls {
                    return Some(Self::element(el));
                }
            }
            current = el.parent_element();
        }

        let element = window.document()?.scrolling_element()?;
        Some(Self {
            element,
            is_document: true,
        })
    }

    fn element(element: Element) -> Self {
        Self {
            element,
            is_document: false,
        }
    }
}

impl ScrollContainer for DomScrollContainer {
    fn bounds(&self) -> Rect {
        if self.is_document {
            let window = web_sys::window();
            let size = |v: Option<wasm_bindgen::JsValue>| v.and_then(|v| v.as_f64()).unwrap_or(0.0);
            let width = size(window.as_ref().and_then(|w| w.inner_width().ok()));
            let height = size(window.as_ref().and_then(|w| w.inner_height().ok()));
            return Rect::new(0.0, 0.0, width, height);
        }
        let r = self.element.get_bounding_client_rect();
        Rect::new(r.left(), r.top(), r.width(), r.height())
    }

    fn scroll_by(&self, dx: f64, dy: f64, smooth: bool) -> bool {
        let before = (self.element.scroll_left(), self.element.scroll_top());
        let options = ScrollToOptions::new();
        options.set_left(dx);
        options.set_top(dy);
        options.set_behavior(if smooth {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Instant
        });
        self.element.scroll_by_with_scroll_to_options(&options);
        if smooth {
            // Position settles over later frames.
            return dx != 0.0 || dy != 0.0;
        }
        before != (self.element.scroll_left(), self.element.scroll_top())
    }
}

/// [`GridHost`] for one grid surface element.
pub struct DomHost {
    surface: HtmlElement,
    geometry: DomGeometry,
}

impl DomHost {
    pub fn new(surface: HtmlElement) -> Self {
        let geometry = DomGeometry::new(surface.clone().into());
        Self { surface, geometry }
    }
}

impl GeometryProvider for DomHost {
    fn cells_info(&self) -> Vec<CellGeometry> {
        self.geometry.cells_info()
    }
}

impl GridHost for DomHost {
    fn scroll_container(&self) -> Option<Rc<dyn ScrollContainer>> {
        let container: Rc<dyn ScrollContainer> = Rc::new(DomScrollContainer::resolve(&self.surface)?);
        Some(container)
    }

    fn set_text_selection_locked(&self, locked: bool) {
        let Some(body) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
        else {
            return;
        };
        let style = body.style();
        for prop in ["user-select", "-webkit-user-select"] {
            let _ = if locked {
                style.set_property(prop, "none")
            } else {
                style.remove_property(prop).map(|_| ())
            };
        }
    }
}
