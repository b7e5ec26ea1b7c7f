//! Presentation of inbound posts.

use crate::board::Post;
use crate::payload::decode_drawing;
use crate::raster::Raster;

/// How a post should be shown.
#[derive(Debug, Clone, PartialEq)]
pub enum PostView {
    /// Markdown source, rendered as formatted text.
    Text { markdown: String },
    /// Decoded drawing, rendered as an image.
    Drawing { image: Raster },
    /// A drawing whose payload could not be decoded. Never shown as text.
    Broken { reason: String },
}

impl PostView {
    pub fn from_post(post: &Post) -> Self {
        if !post.is_drawing {
            return PostView::Text {
                markdown: post.content.clone(),
            };
        }
        match decode_drawing(&post.content) {
            Ok(image) => PostView::Drawing { image },
            Err(e) => {
                log::warn!("Post {} has an unreadable drawing: {}", post.id, e);
                PostView::Broken {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Single-line description for plain-text output.
    pub fn summary(&self) -> String {
        match self {
            PostView::Text { markdown } => markdown.clone(),
            PostView::Drawing { image } => format!("[drawing {}x{}]", image.width(), image.height()),
            PostView::Broken { reason } => format!("[unreadable drawing: {}]", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DrawingPayload;
    use crate::raster::Rgba8;
    use chrono::Utc;

    fn post(content: String, is_drawing: bool) -> Post {
        Post {
            id: 7,
            thread_id: 1,
            content,
            author_name: "A".to_string(),
            is_drawing,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_text_post_is_markdown() {
        let view = PostView::from_post(&post("**bold**".to_string(), false));
        assert_eq!(view, PostView::Text { markdown: "**bold**".to_string() });
    }

    #[test]
    fn test_drawing_post_is_image() {
        let payload = DrawingPayload::encode(&Raster::new(30, 20, Rgba8::white())).unwrap();
        let view = PostView::from_post(&post(payload.into_string(), true));
        assert!(matches!(&view, PostView::Drawing { image } if image.width() == 30));
        assert_eq!(view.summary(), "[drawing 30x20]");
    }

    #[test]
    fn test_data_url_text_stays_text() {
        let payload = DrawingPayload::encode(&Raster::new(2, 2, Rgba8::white())).unwrap();
        let view = PostView::from_post(&post(payload.into_string(), false));
        assert!(matches!(view, PostView::Text { .. }));
    }

    #[test]
    fn test_broken_drawing() {
        let view = PostView::from_post(&post("hello".to_string(), true));
        assert!(matches!(view, PostView::Broken { .. }));
    }
}
