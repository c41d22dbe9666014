//! Text string decoding
//!
//! Fonts with a `ToUnicode` CMap are decoded through it. Simple fonts with a
//! WinAnsi base or a `/Differences` array go through their byte encoding;
//! everything else is read as UTF-16BE (when it carries a BOM) or Latin-1.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};

/// Most entries a single `bfrange` may contribute
const MAX_RANGE_ENTRIES: u32 = 0x1_0000;

/// WinAnsiEncoding for 0x80..=0x9F; `None` where the slot is undefined
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('‘'), Some('’'), Some('“'), Some('”'), Some('•'), Some('–'), Some('—'),
    Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None, Some('ž'), Some('Ÿ'),
];

/// Glyph names seen in `/Differences` arrays that are not a single letter
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("period", '.'),
    ("slash", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("underscore", '_'),
    ("bar", '|'),
    ("quoteleft", '‘'),
    ("quoteright", '’'),
    ("quotedblleft", '“'),
    ("quotedblright", '”'),
    ("quotesinglbase", '‚'),
    ("quotedblbase", '„'),
    ("endash", '–'),
    ("emdash", '—'),
    ("bullet", '•'),
    ("ellipsis", '…'),
    ("Euro", '€'),
    ("degree", '°'),
    ("ordfeminine", 'ª'),
    ("ordmasculine", 'º'),
    ("aacute", 'á'),
    ("agrave", 'à'),
    ("acircumflex", 'â'),
    ("atilde", 'ã'),
    ("ccedilla", 'ç'),
    ("eacute", 'é'),
    ("ecircumflex", 'ê'),
    ("iacute", 'í'),
    ("oacute", 'ó'),
    ("ocircumflex", 'ô'),
    ("otilde", 'õ'),
    ("uacute", 'ú'),
    ("Aacute", 'Á'),
    ("Atilde", 'Ã'),
    ("Ccedilla", 'Ç'),
    ("Eacute", 'É'),
    ("Oacute", 'Ó'),
    ("Otilde", 'Õ'),
];

/// Decodes string operands shown with one font
#[derive(Debug, Clone, Default)]
pub struct FontDecoder {
    to_unicode: Option<HashMap<u32, String>>,
    code_len: usize,
    /// Byte table of a simple font's `/Encoding`
    encoding: Option<Box<[char; 256]>>,
}

impl FontDecoder {
    pub fn decode(&self, bytes: &[u8]) -> String {
        let Some(map) = &self.to_unicode else {
            return match &self.encoding {
                Some(table) => bytes.iter().map(|&b| table[b as usize]).collect(),
                None => decode_text_string(bytes),
            };
        };

        let mut out = String::new();
        for code in bytes.chunks(self.code_len.max(1)) {
            let key = code.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            match map.get(&key) {
                Some(text) => out.push_str(text),
                None if code.len() == 1 => out.push(code[0] as char),
                None => {}
            }
        }
        out
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, else Latin-1
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .map(|pair| {
                let hi = pair[0] as u16;
                let lo = pair.get(1).copied().unwrap_or(0) as u16;
                (hi << 8) | lo
            })
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Build decoders for every font in a page's resources, keyed by resource name
pub fn page_fonts(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, FontDecoder> {
    let mut fonts = BTreeMap::new();

    let Some(resources) = inherited(doc, page_id, b"Resources").and_then(|o| resolve_dict(doc, o))
    else {
        return fonts;
    };
    let Some(font_dict) = resources
        .get(b"Font")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return fonts;
    };

    for (name, value) in font_dict.iter() {
        if let Some(font) = resolve_dict(doc, value) {
            fonts.insert(name.clone(), font_decoder(doc, font));
        }
    }
    fonts
}

fn font_decoder(doc: &Document, font: &Dictionary) -> FontDecoder {
    let composite = matches!(font.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Type0");
    let default_len = if composite { 2 } else { 1 };

    let cmap = font
        .get(b"ToUnicode")
        .ok()
        .and_then(|o| o.as_reference().ok())
        .and_then(|id| doc.get_object(id).ok())
        .and_then(|o| o.as_stream().ok())
        .and_then(|stream| {
            if stream.dict.get(b"Filter").is_ok() {
                stream.decompressed_content().ok()
            } else {
                Some(stream.content.clone())
            }
        })
        .map(|bytes| parse_to_unicode(&bytes));

    match cmap {
        Some((map, code_len)) => FontDecoder {
            to_unicode: Some(map),
            code_len: code_len.unwrap_or(default_len),
            encoding: None,
        },
        None => FontDecoder {
            to_unicode: None,
            code_len: default_len,
            encoding: if composite {
                None
            } else {
                simple_encoding(doc, font)
            },
        },
    }
}

/// Byte table for a simple font, when its `/Encoding` says more than Latin-1
fn simple_encoding(doc: &Document, font: &Dictionary) -> Option<Box<[char; 256]>> {
    let encoding = font.get(b"Encoding").ok()?;

    let (base, differences) = match encoding {
        Object::Name(name) => (name.as_slice(), None),
        other => {
            let dict = resolve_dict(doc, other)?;
            let base = match dict.get(b"BaseEncoding") {
                Ok(Object::Name(name)) => name.as_slice(),
                _ => b"".as_slice(),
            };
            (base, dict.get(b"Differences").and_then(Object::as_array).ok())
        }
    };

    let win_ansi = base == b"WinAnsiEncoding";
    if !win_ansi && differences.is_none() {
        return None;
    }

    let mut table: [char; 256] = std::array::from_fn(|b| b as u8 as char);
    if win_ansi {
        for (slot, ch) in table[0x80..0xA0].iter_mut().zip(WIN_ANSI_HIGH) {
            if let Some(ch) = ch {
                *slot = ch;
            }
        }
    }

    // [code name name ... code name ...]: names fill consecutive codes
    let mut code: Option<usize> = None;
    for item in differences.into_iter().flatten() {
        match item {
            Object::Integer(start) => code = usize::try_from(*start).ok(),
            Object::Name(name) => {
                if let Some(c) = code.filter(|&c| c < 256) {
                    if let Some(ch) = glyph_char(name) {
                        table[c] = ch;
                    }
                    code = Some(c + 1);
                }
            }
            _ => {}
        }
    }

    Some(Box::new(table))
}

/// Unicode for a glyph name: `uniXXXX`, a single letter, or a known name
fn glyph_char(name: &[u8]) -> Option<char> {
    let name = std::str::from_utf8(name).ok()?;
    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_alphanumeric() {
            return Some(ch);
        }
    }
    GLYPH_NAMES
        .iter()
        .find(|(glyph, _)| *glyph == name)
        .map(|&(_, ch)| ch)
}

/// Look up a page attribute, walking up `/Parent` links
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    // Bounded walk guards against cyclic Parent chains
    for _ in 0..64 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Word(String),
    Open,
    Close,
}

fn tokenize(src: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < src.len() {
        match src[i] {
            b'<' => {
                let end = src[i + 1..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(src.len(), |p| i + 1 + p);
                let digits: Vec<u8> = src[i + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                tokens.push(Token::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b']' => {
                tokens.push(Token::Close);
                i += 1;
            }
            b'%' => {
                while i < src.len() && src[i] != b'\n' && src[i] != b'\r' {
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < src.len()
                    && !src[i].is_ascii_whitespace()
                    && !matches!(src[i], b'<' | b'[' | b']' | b'%')
                {
                    i += 1;
                }
                tokens.push(Token::Word(
                    String::from_utf8_lossy(&src[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let nibble = |d: u8| (d as char).to_digit(16).unwrap_or(0) as u8;
    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0]);
            let lo = pair.get(1).map_or(0, |&d| nibble(d));
            (hi << 4) | lo
        })
        .collect()
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| ((pair[0] as u16) << 8) | pair.get(1).copied().unwrap_or(0) as u16)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Parse `bfchar` / `bfrange` sections; also reports the code width
/// declared by the first codespace range.
fn parse_to_unicode(src: &[u8]) -> (HashMap<u32, String>, Option<usize>) {
    let tokens = tokenize(src);
    let mut map = HashMap::new();
    let mut code_len = None;
    let mut i = 0;

    while i < tokens.len() {
        let Token::Word(word) = &tokens[i] else {
            i += 1;
            continue;
        };
        match word.as_str() {
            "begincodespacerange" => {
                if let Some(Token::Hex(lo)) = tokens.get(i + 1) {
                    code_len.get_or_insert(lo.len());
                }
                i += 1;
            }
            "beginbfchar" => {
                i += 1;
                while let (Some(Token::Hex(code)), Some(Token::Hex(dst))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    map.insert(code_value(code), utf16_text(dst));
                    i += 2;
                }
            }
            "beginbfrange" => {
                i += 1;
                while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    let lo = code_value(lo);
                    let hi = code_value(hi).min(lo.saturating_add(MAX_RANGE_ENTRIES - 1));
                    match tokens.get(i + 2) {
                        Some(Token::Hex(dst)) => {
                            let base = code_value(dst);
                            for code in lo..=hi {
                                let Some(target) = base.checked_add(code - lo) else {
                                    break;
                                };
                                if let Some(ch) = char::from_u32(target) {
                                    map.insert(code, ch.to_string());
                                }
                            }
                            i += 3;
                        }
                        Some(Token::Open) => {
                            i += 3;
                            let mut code = Some(lo);
                            while let Some(Token::Hex(dst)) = tokens.get(i) {
                                if let Some(c) = code.filter(|&c| c <= hi) {
                                    map.insert(c, utf16_text(dst));
                                }
                                code = code.and_then(|c| c.checked_add(1));
                                i += 1;
                            }
                            if tokens.get(i) == Some(&Token::Close) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }

    (map, code_len)
}
