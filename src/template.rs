use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateSlot {
    Header = 0,
    Features = 1,
    Modes = 2,
    Common = 3,
    VertexInput = 4,
    PixelInput = 5,
    VertexBody = 6,
    PixelBody = 7,
    PixelResult = 8,
}

impl TemplateSlot {
    pub const COUNT: usize = 9;

    pub const ALL: [TemplateSlot; Self::COUNT] = [
        TemplateSlot::Header,
        TemplateSlot::Features,
        TemplateSlot::Modes,
        TemplateSlot::Common,
        TemplateSlot::VertexInput,
        TemplateSlot::PixelInput,
        TemplateSlot::VertexBody,
        TemplateSlot::PixelBody,
        TemplateSlot::PixelResult,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed slot at byte {0}")]
    UnclosedSlot(usize),
    #[error("invalid slot \"{0}\"")]
    InvalidSlot(String),
    #[error("slot {0} is out of range")]
    SlotOutOfRange(usize),
    #[error("unmatched '}}' at byte {0}")]
    UnmatchedBrace(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(TemplateSlot),
}

/// Generated text for every template slot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TemplateSlots([String; TemplateSlot::COUNT]);

impl TemplateSlots {
    pub fn set(&mut self, slot: TemplateSlot, text: impl Into<String>) {
        self.0[slot as usize] = text.into();
    }

    pub fn get(&self, slot: TemplateSlot) -> &str {
        &self.0[slot as usize]
    }
}

/// Shader source with numbered `{N}` substitution slots. Literal braces are
/// written `{{` and `}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    segments: Vec<Segment>,
}

impl ShaderTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::with_capacity(source.len());
        let mut chars = source.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|x| x.1) == Some('{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().map(|x| x.1) == Some('}') => {
                    chars.next();
                    text.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedBrace(position)),
                '{' => {
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, x)) => digits.push(x),
                            None => return Err(TemplateError::UnclosedSlot(position)),
                        }
                    }

                    let index: usize = digits
                        .trim()
                        .parse()
                        .map_err(|_| TemplateError::InvalidSlot(digits.clone()))?;
                    let slot = TemplateSlot::from_index(index)
                        .ok_or(TemplateError::SlotOutOfRange(index))?;

                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Slot(slot));
                }
                c => text.push(c),
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { segments })
    }

    pub fn material() -> Result<Self, TemplateError> {
        Self::parse(MATERIAL_TEMPLATE)
    }

    pub fn preview() -> Result<Self, TemplateError> {
        Self::parse(PREVIEW_TEMPLATE)
    }

    pub fn slots(&self) -> impl Iterator<Item = TemplateSlot> + '_ {
        self.segments.iter().filter_map(|x| match x {
            Segment::Slot(slot) => Some(*slot),
            Segment::Text(_) => None,
        })
    }

    /// Single positional substitution, no other processing.
    pub fn assemble(&self, slots: &TemplateSlots) -> String {
        let mut result = String::new();
        for segment in self.segments.iter() {
            match segment {
                Segment::Text(text) => result.push_str(text),
                Segment::Slot(slot) => result.push_str(slots.get(*slot)),
            }
        }
        result
    }
}

pub const MATERIAL_TEMPLATE: &str = r#"HEADER
{{
{0}
}}

FEATURES
{{
    #include "common/features.hlsl"
{1}
}}

MODES
{{
{2}
}}

COMMON
{{
    #include "common/shared.hlsl"
{3}
}}

struct VertexInput
{{
    #include "common/vertexinput.hlsl"
{4}
}};

struct PixelInput
{{
    #include "common/pixelinput.hlsl"
{5}
}};

VS
{{
    #include "common/vertex.hlsl"

    PixelInput MainVs( VertexInput i )
    {{
        PixelInput o = ProcessVertex( i );
{6}
        return FinalizeVertex( o );
    }}
}}

PS
{{
    #include "common/pixel.hlsl"

    float4 MainPs( PixelInput i ) : SV_Target0
    {{
{7}
{8}
    }}
}}
"#;

pub const PREVIEW_TEMPLATE: &str = r#"HEADER
{{
{0}
}}

MODES
{{
{2}
}}

COMMON
{{
    #include "common/shared.hlsl"
{3}
}}

struct VertexInput
{{
    #include "common/vertexinput.hlsl"
{4}
}};

struct PixelInput
{{
    #include "common/pixelinput.hlsl"
{5}
}};

VS
{{
    #include "common/vertex.hlsl"

    PixelInput MainVs( VertexInput i )
    {{
        PixelInput o = ProcessVertex( i );
{6}
        return FinalizeVertex( o );
    }}
}}

PS
{{
    float4 MainPs( PixelInput i ) : SV_Target0
    {{
{7}
{8}
    }}
}}
"#;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_and_assemble() {
        let template = ShaderTemplate::parse("A {{ {0} }} {3}{0}").unwrap();
        let mut slots = TemplateSlots::default();
        slots.set(TemplateSlot::Header, "x");
        slots.set(TemplateSlot::Common, "y");
        assert_eq!(template.assemble(&slots), "A { x } yx");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ShaderTemplate::parse("{9}"),
            Err(TemplateError::SlotOutOfRange(9))
        );
        assert_eq!(
            ShaderTemplate::parse("{a}"),
            Err(TemplateError::InvalidSlot("a".to_owned()))
        );
        assert_eq!(
            ShaderTemplate::parse("text {1"),
            Err(TemplateError::UnclosedSlot(5))
        );
        assert_eq!(
            ShaderTemplate::parse("a } b"),
            Err(TemplateError::UnmatchedBrace(2))
        );
    }

    #[test]
    fn test_builtin_templates() {
        let material = ShaderTemplate::material().unwrap();
        let slots: Vec<_> = material.slots().collect();
        assert_eq!(slots, TemplateSlot::ALL.to_vec());

        let preview = ShaderTemplate::preview().unwrap();
        assert!(!preview.slots().any(|x| x == TemplateSlot::Features));

        let text = material.assemble(&TemplateSlots::default());
        assert!(text.contains("float4 MainPs( PixelInput i ) : SV_Target0\n    {"));
        assert!(!text.contains("{{"));
    }
}
