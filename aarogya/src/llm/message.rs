use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// One item of a message's content, in the order the model should see it.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Image { data: Vec<u8>, mime_type: String },
    Text(String),
}

impl ContentBlock {
    /// Image block whose MIME type is sniffed from the bytes, falling back to JPEG.
    pub fn image(data: Vec<u8>) -> Self {
        let mime_type = infer::get(&data)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());
        Self::Image { data, mime_type }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// `data:` URL for image blocks.
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Image { data, mime_type } => {
                Some(format!("data:{mime_type};base64,{}", STANDARD.encode(data)))
            }
            Self::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Concatenated text blocks, separated by blank lines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(text) => Some(text.as_str()),
                ContentBlock::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::Image { .. }))
    }
}
