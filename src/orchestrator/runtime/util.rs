use crate::orchestrator::constants::MIN_UTTERANCE_CHARS;
use crate::orchestrator::error::ProviderError;
use crate::orchestrator::types::Utterance;

/// 清理模型输出：去掉 `"<name>:"` 前缀与双引号，并按字符数截断。
pub(crate) fn sanitize_utterance(
    utterance: Utterance,
    speaker: &str,
    max_chars: usize,
) -> Result<Utterance, ProviderError> {
    let mut text = utterance.text.trim();
    let prefix = format!("{speaker}:");
    if let Some(rest) = text.strip_prefix(prefix.as_str()) {
        text = rest.trim_start();
    }

    let unquoted: String = text.chars().filter(|ch| *ch != '"').collect();
    let clamped = clamp_chars(unquoted.trim(), max_chars);

    if clamped.chars().count() < MIN_UTTERANCE_CHARS {
        return Err(ProviderError::InvalidResponse(format!(
            "utterance for {speaker} is empty or too short"
        )));
    }

    Ok(Utterance {
        text: clamped,
        reply_to: utterance.reply_to.filter(|target| target != speaker),
    })
}

fn clamp_chars(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let head = &text[..cut];
    let sentence_end = head
        .char_indices()
        .filter(|(_, ch)| matches!(ch, '.' | '!' | '?'))
        .map(|(idx, ch)| idx + ch.len_utf8())
        .last()
        .filter(|end| *end >= head.len() / 2);

    match sentence_end {
        Some(end) => head[..end].trim_end().to_string(),
        None => head.trim_end().to_string(),
    }
}
