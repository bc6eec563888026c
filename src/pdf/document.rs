//! Minimal PDF writer: one full-bleed image per page, page size = image pixel size.

use crate::pdf::image::{ColorSpace, EmbeddedImage, ImageStream};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};

const IMAGE_NAME: Name<'static> = Name(b"Im0");

/// A PDF under construction. Starts with no pages.
pub struct PdfDocument {
    pdf: Pdf,
    alloc: Ref,
    catalog_id: Ref,
    page_tree_id: Ref,
    pages: Vec<Ref>,
    title: Option<String>,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let page_tree_id = alloc.bump();
        Self {
            pdf: Pdf::new(),
            alloc,
            catalog_id,
            page_tree_id,
            pages: Vec::new(),
            title: None,
        }
    }

    /// Title written to the document information dictionary.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append a page of exactly `image.width` x `image.height` points with the
    /// image drawn at the origin, filling it.
    pub fn add_image_page(&mut self, image: &EmbeddedImage) {
        let page_id = self.alloc.bump();
        let content_id = self.alloc.bump();
        let image_id = self.alloc.bump();
        let mask_id = image.has_alpha().then(|| self.alloc.bump());
        let (w, h) = (image.width as f32, image.height as f32);

        let mut page = self.pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, w, h));
        page.parent(self.page_tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(IMAGE_NAME, image_id);
        page.finish();

        let (data, filter, alpha) = match &image.stream {
            ImageStream::Dct(data) => (data.as_slice(), Filter::DctDecode, None),
            ImageStream::Flate { samples, alpha } => {
                (samples.as_slice(), Filter::FlateDecode, alpha.as_deref())
            }
        };
        let mut xobject = self.pdf.image_xobject(image_id, data);
        xobject.filter(filter);
        xobject.width(image.width as i32);
        xobject.height(image.height as i32);
        match image.color {
            ColorSpace::Gray => xobject.color_space().device_gray(),
            ColorSpace::Rgb => xobject.color_space().device_rgb(),
        }
        xobject.bits_per_component(8);
        if let Some(mask_id) = mask_id {
            xobject.s_mask(mask_id);
        }
        xobject.finish();

        if let (Some(mask_id), Some(alpha)) = (mask_id, alpha) {
            let mut mask = self.pdf.image_xobject(mask_id, alpha);
            mask.filter(Filter::FlateDecode);
            mask.width(image.width as i32);
            mask.height(image.height as i32);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
            mask.finish();
        }

        let mut content = Content::new();
        content.save_state();
        content.transform([w, 0.0, 0.0, h, 0.0, 0.0]);
        content.x_object(IMAGE_NAME);
        content.restore_state();
        self.pdf.stream(content_id, &content.finish());

        self.pages.push(page_id);
    }

    /// Write the catalog and page tree and return the file bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.page_tree_id);
        let count = self.pages.len() as i32;
        self.pdf
            .pages(self.page_tree_id)
            .kids(self.pages.iter().copied())
            .count(count);
        if let Some(title) = &self.title {
            let info_id = self.alloc.bump();
            self.pdf
                .document_info(info_id)
                .title(TextStr(title.as_str()))
                .producer(TextStr(concat!("mangapdf ", env!("CARGO_PKG_VERSION"))));
        }
        self.pdf.finish()
    }
}

#[cfg(test)]
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
