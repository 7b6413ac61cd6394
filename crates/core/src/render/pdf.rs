//! Encodes a [`Layout`] as PDF bytes with `printpdf` built-in Helvetica fonts.

use super::layout::{DrawOp, FontFace, Layout, Rgb};
use crate::error::RenderError;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Polygon,
};
use std::io::BufWriter;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Oblique => &self.oblique,
        }
    }
}

fn pdf_error(context: &str, e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(format!("{context}: {e}"))
}

pub(crate) fn encode(layout: &Layout) -> Result<Vec<u8>, RenderError> {
    let width = Mm(layout.geometry.width_mm);
    let height = Mm(layout.geometry.height_mm);
    let (doc, first_page, first_layer) = PdfDocument::new(&layout.title, width, height, "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| pdf_error("font error", e))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| pdf_error("font error", e))?,
        oblique: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| pdf_error("font error", e))?,
    };

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(width, height, "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        for op in &page.ops {
            draw(&layer, op, &fonts);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(|e| pdf_error("save error", e))?;
    buf.into_inner().map_err(|e| pdf_error("buffer error", e))
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(rgb.r, rgb.g, rgb.b, None))
}

fn draw(layer: &PdfLayerReference, op: &DrawOp, fonts: &Fonts) {
    match op {
        DrawOp::Text {
            x_mm,
            y_mm,
            size_pt,
            face,
            color: rgb,
            text,
        } => {
            layer.set_fill_color(color(*rgb));
            layer.use_text(text.as_str(), *size_pt, Mm(*x_mm), Mm(*y_mm), fonts.get(*face));
        }
        DrawOp::FillRect {
            x_mm,
            y_mm,
            width_mm,
            height_mm,
            color: rgb,
        } => {
            let corners = [
                (*x_mm, *y_mm),
                (*x_mm + *width_mm, *y_mm),
                (*x_mm + *width_mm, *y_mm + *height_mm),
                (*x_mm, *y_mm + *height_mm),
            ];
            layer.set_fill_color(color(*rgb));
            layer.add_polygon(Polygon {
                rings: vec![corners
                    .iter()
                    .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
                    .collect()],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        DrawOp::Line {
            from_mm,
            to_mm,
            thickness_pt,
            color: rgb,
        } => {
            layer.set_outline_color(color(*rgb));
            layer.set_outline_thickness(*thickness_pt);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(from_mm.0), Mm(from_mm.1)), false),
                    (Point::new(Mm(to_mm.0), Mm(to_mm.1)), false),
                ],
                is_closed: false,
            });
        }
    }
}
