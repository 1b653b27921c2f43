use tracing::debug;

use super::models::{SourceFormat, StreamDescriptor};

/// 按视频源格式过滤出带视频的流，并按清晰度从高到低排序
///
/// 清晰度相同的流保持解析器给出的原始顺序。
pub fn enumerate(streams: &[StreamDescriptor], source: SourceFormat) -> Vec<StreamDescriptor> {
    let mut selected: Vec<StreamDescriptor> = streams
        .iter()
        .filter(|s| s.has_video() && s.resolution.is_some())
        .filter(|s| s.ext.eq_ignore_ascii_case(source.extension()))
        .cloned()
        .collect();

    // sort_by 是稳定排序
    selected.sort_by(|a, b| b.resolution.cmp(&a.resolution));

    debug!("可用的视频流数量: {}", selected.len());
    for (i, stream) in selected.iter().enumerate() {
        debug!("流 {}: 格式ID={}, {}", i + 1, stream.format_id, stream.label());
    }
    selected
}

/// 根据用户输入的序号（从 1 开始）选择流
///
/// 输入为空、不是数字或超出范围时，回退到第一个（最高清晰度）。
/// 只有列表为空时返回 `None`。
pub fn select_stream<'a>(
    streams: &'a [StreamDescriptor],
    choice: &str,
) -> Option<&'a StreamDescriptor> {
    let choice = choice.trim();
    let index = if !choice.is_empty() && choice.chars().all(|c| c.is_ascii_digit()) {
        choice.parse::<usize>().ok()
    } else {
        None
    };

    match index {
        Some(i) if i >= 1 && i <= streams.len() => {
            debug!("选择第 {} 个流", i);
            streams.get(i - 1)
        }
        _ => {
            debug!("输入 {:?} 无效或为空，默认选择最高清晰度", choice);
            streams.first()
        }
    }
}

/// 选择最佳的音频流：平均码率最高者，码率相同取最先出现的
pub fn select_best_audio(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    let selected = streams
        .iter()
        .filter(|s| s.is_audio_only())
        .fold(None::<&StreamDescriptor>, |best, s| match best {
            Some(b) if b.abr.unwrap_or(0.0) >= s.abr.unwrap_or(0.0) => Some(b),
            _ => Some(s),
        });

    if let Some(audio) = selected {
        debug!(
            "选择最高质量音频流: 格式ID={}, 码率={:?}",
            audio.format_id, audio.abr
        );
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::models::{StreamHandle, StreamKind};

    fn video(id: &str, resolution: u32, ext: &str, kind: StreamKind) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            resolution: Some(resolution),
            fps: Some(30),
            ext: ext.to_string(),
            abr: None,
            kind,
            filesize: None,
            handle: StreamHandle::default(),
        }
    }

    fn audio(id: &str, abr: Option<f64>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            resolution: None,
            fps: None,
            ext: "m4a".to_string(),
            abr,
            kind: StreamKind::AudioOnly,
            filesize: None,
            handle: StreamHandle::default(),
        }
    }

    fn sample() -> Vec<StreamDescriptor> {
        vec![
            video("18", 360, "mp4", StreamKind::Progressive),
            audio("140", Some(128.0)),
            video("137", 1080, "mp4", StreamKind::VideoOnly),
            video("248", 1080, "webm", StreamKind::VideoOnly),
            video("22", 720, "mp4", StreamKind::Progressive),
            video("399", 1080, "mp4", StreamKind::VideoOnly),
        ]
    }

    #[test]
    fn enumerate_filters_container_and_orders_descending() {
        let list = enumerate(&sample(), SourceFormat::Mp4);
        let ids: Vec<&str> = list.iter().map(|s| s.format_id.as_str()).collect();
        // 相同清晰度保持原顺序
        assert_eq!(ids, vec!["137", "399", "22", "18"]);
    }

    #[test]
    fn enumerate_other_container() {
        let list = enumerate(&sample(), SourceFormat::Webm);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].format_id, "248");
    }

    #[test]
    fn select_valid_index() {
        let list = enumerate(&sample(), SourceFormat::Mp4);
        for (i, expected) in list.iter().enumerate() {
            let picked = select_stream(&list, &(i + 1).to_string()).unwrap();
            assert_eq!(picked, expected);
        }
        assert_eq!(select_stream(&list, " 3 ").unwrap().format_id, "22");
    }

    #[test]
    fn invalid_choice_defaults_to_highest() {
        let list = enumerate(&sample(), SourceFormat::Mp4);
        for choice in ["", "0", "5", "99", "-1", "+2", "abc", "1.5", "99999999999999999999999"] {
            assert_eq!(
                select_stream(&list, choice).unwrap().format_id,
                "137",
                "choice {:?}",
                choice
            );
        }
    }

    #[test]
    fn select_from_empty_list() {
        assert!(select_stream(&[], "1").is_none());
    }

    #[test]
    fn best_audio_is_highest_bitrate_first_seen() {
        let streams = vec![
            audio("a", Some(64.0)),
            video("137", 1080, "mp4", StreamKind::VideoOnly),
            audio("b", Some(160.0)),
            audio("c", Some(160.0)),
            audio("d", None),
        ];
        assert_eq!(select_best_audio(&streams).unwrap().format_id, "b");
    }

    #[test]
    fn best_audio_none_when_no_audio_only_streams() {
        let streams = vec![video("18", 360, "mp4", StreamKind::Progressive)];
        assert!(select_best_audio(&streams).is_none());
    }
}
