use std::fmt;
use std::str::FromStr;

use crate::error::CompileError;
use crate::pattern::component::{AddResult, Literal, PatternComponent};
use crate::pattern::modifier::FormatModifier;
use crate::pattern::specifier::{ConversionSpecifier, SpecifierKind};

/// Non-fatal findings about a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// Two specifiers with no literal between them; the first one's span is cut
    /// at the end of its content class and the rest is left to the second.
    AmbiguousBoundary { first: char, second: char, offset: usize },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::AmbiguousBoundary { first, second, offset } => write!(
                f,
                "'%{}' is directly followed by '%{}' at offset {}: boundary between them is ambiguous",
                first, second, offset
            ),
        }
    }
}

/// A compiled template: the ordered, branch-free chain of literals and specifiers.
///
/// Immutable once built; matching never mutates it, so one instance can be shared
/// across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPattern {
    source: String,
    components: Vec<PatternComponent>,
    warnings: Vec<CompileWarning>,
}

impl ConversionPattern {
    pub fn compile(template: &str) -> Result<Self, CompileError> {
        PatternCompiler::new(template).compile()
    }

    /// The template as given to [`compile`](Self::compile).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn components(&self) -> &[PatternComponent] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&PatternComponent> {
        self.components.get(index)
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn specifiers(&self) -> impl Iterator<Item = &ConversionSpecifier> {
        self.components.iter().filter_map(PatternComponent::as_specifier)
    }

    /// Rebuild the template from the components.
    pub fn pattern_literal(&self) -> String {
        self.components.iter().map(PatternComponent::pattern_literal).collect()
    }

    /// True when the last field is the message, so lines that do not start a new
    /// record belong to the previous record's message.
    pub fn is_continuable(&self) -> bool {
        self.components
            .iter()
            .rev()
            .find(|c| {
                !matches!(c, PatternComponent::Specifier(s) if s.kind() == SpecifierKind::LineSeparator)
            })
            .and_then(PatternComponent::as_specifier)
            .map(|s| s.kind() == SpecifierKind::Message)
            .unwrap_or(false)
    }
}

impl FromStr for ConversionPattern {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversionPattern::compile(s)
    }
}

impl fmt::Display for ConversionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern_literal())
    }
}

/// Single-pass, character-driven template compiler.
pub struct PatternCompiler<'a> {
    template: &'a str,
    chars: Vec<char>,
    components: Vec<PatternComponent>,
    offsets: Vec<usize>,
    literal: String,
    literal_start: usize,
}

impl<'a> PatternCompiler<'a> {
    pub fn new(template: &'a str) -> Self {
        PatternCompiler {
            template,
            chars: template.chars().collect(),
            components: Vec::new(),
            offsets: Vec::new(),
            literal: String::new(),
            literal_start: 0,
        }
    }

    pub fn compile(mut self) -> Result<ConversionPattern, CompileError> {
        // Open specifier, offset of its '%', offset of its '{' once an argument has started.
        let mut current: Option<(ConversionSpecifier, usize, Option<usize>)> = None;
        let mut i = 0;

        while i < self.chars.len() {
            let c = self.chars[i];

            if let Some((specifier, start, brace)) = current.as_mut() {
                match specifier.add(c).map_err(|e| e.shifted(i))? {
                    AddResult::Accepted => {
                        if brace.is_none() {
                            *brace = Some(i);
                        }
                        i += 1;
                        continue;
                    }
                    AddResult::AcceptedAndClosed => {
                        let start = *start;
                        if let Some((specifier, _, _)) = current.take() {
                            self.push(PatternComponent::Specifier(specifier), start);
                        }
                        i += 1;
                        continue;
                    }
                    AddResult::NotAccepted => {
                        let start = *start;
                        if let Some((specifier, _, _)) = current.take() {
                            self.push(PatternComponent::Specifier(specifier), start);
                        }
                        // `c` starts the next component
                    }
                }
            }

            if c == '%' {
                if self.chars.get(i + 1) == Some(&'%') {
                    self.push_literal_char('%', i);
                    i += 2;
                    continue;
                }
                self.flush_literal();
                let (specifier, next) = self.start_specifier(i)?;
                current = Some((specifier, i, None));
                i = next;
                continue;
            }

            self.push_literal_char(c, i);
            i += 1;
        }

        if let Some((mut specifier, start, brace)) = current.take() {
            specifier
                .finish()
                .map_err(|e| e.shifted(brace.unwrap_or(start)))?;
            self.push(PatternComponent::Specifier(specifier), start);
        }
        self.flush_literal();

        let count = self.components.len();
        for (index, component) in self.components.iter_mut().enumerate() {
            if let PatternComponent::Specifier(specifier) = component {
                specifier.set_next(if index + 1 < count { Some(index + 1) } else { None });
            }
        }

        let warnings = self.ambiguous_boundaries();
        for warning in &warnings {
            tracing::warn!(template = self.template, "{}", warning);
        }
        tracing::debug!(
            template = self.template,
            components = self.components.len(),
            "compiled conversion pattern"
        );

        Ok(ConversionPattern {
            source: self.template.to_string(),
            components: self.components,
            warnings,
        })
    }

    /// Parse `%[modifier]c` starting at the `%` at `percent`; returns the open
    /// specifier and the offset just past its conversion character.
    fn start_specifier(&self, percent: usize) -> Result<(ConversionSpecifier, usize), CompileError> {
        let modifier_start = percent + 1;
        let mut j = modifier_start;
        while j < self.chars.len() && matches!(self.chars[j], '-' | '.' | '0'..='9') {
            j += 1;
        }

        let Some(&character) = self.chars.get(j) else {
            return Err(CompileError::MalformedTemplate {
                offset: percent,
                message: "'%' at end of template is missing its conversion character".to_string(),
            });
        };
        let kind = SpecifierKind::from_conversion_character(character)
            .ok_or(CompileError::UnknownConversionCharacter { character, offset: j })?;

        let modifier = if j > modifier_start {
            let text: String = self.chars[modifier_start..j].iter().collect();
            Some(FormatModifier::parse(&text).map_err(|e| e.shifted(modifier_start))?)
        } else {
            None
        };

        let specifier = ConversionSpecifier::new(kind, modifier).map_err(|e| e.shifted(modifier_start))?;
        Ok((specifier, j + 1))
    }

    fn push_literal_char(&mut self, c: char, offset: usize) {
        if self.literal.is_empty() {
            self.literal_start = offset;
        }
        self.literal.push(c);
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            self.push(PatternComponent::Literal(Literal::new(text)), self.literal_start);
        }
    }

    fn push(&mut self, component: PatternComponent, offset: usize) {
        self.components.push(component);
        self.offsets.push(offset);
    }

    fn ambiguous_boundaries(&self) -> Vec<CompileWarning> {
        self.components
            .windows(2)
            .zip(self.offsets.iter().skip(1))
            .filter_map(|(pair, offset)| match (&pair[0], &pair[1]) {
                (PatternComponent::Specifier(first), PatternComponent::Specifier(second))
                    if !first.kind().is_self_delimiting()
                        && second.kind() != SpecifierKind::LineSeparator =>
                {
                    Some(CompileWarning::AmbiguousBoundary {
                        first: first.conversion_character(),
                        second: second.conversion_character(),
                        offset: *offset,
                    })
                }
                _ => None,
            })
            .collect()
    }
}
