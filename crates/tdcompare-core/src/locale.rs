//! Report language selection and localized user-facing strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tdcompare_render::{DocumentLabels, OutputFormat};
use tracing::debug;
use whatlang::{Detector, Lang};

/// Natural language used for prompts, replies and rendered documents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
    #[default]
    #[strum(to_string = "ru", serialize = "russian")]
    #[serde(alias = "ru")]
    Russian,
    #[strum(to_string = "en", serialize = "english")]
    #[serde(alias = "en")]
    English,
}

const DETECTION_SEPARATOR: &str = "\n\n";

/// Pick the report locale for a document pair.
///
/// Detection is restricted to Russian and English. Undetectable input and
/// results with no margin between the candidates fall back to `default`.
pub fn select_locale(text1: &str, text2: &str, default: Locale) -> Locale {
    let combined = [text1, text2].join(DETECTION_SEPARATOR);
    let detector = Detector::with_allowlist(vec![Lang::Rus, Lang::Eng]);

    let locale = match detector.detect(&combined) {
        Some(info) if info.confidence() > 0.0 => match info.lang() {
            Lang::Rus => Locale::Russian,
            Lang::Eng => Locale::English,
            _ => default,
        },
        _ => default,
    };

    debug!(%locale, chars = combined.chars().count(), "Selected report locale");
    locale
}

impl Locale {
    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Russian => "ru",
            Locale::English => "en",
        }
    }

    /// Heading and file stem for rendered documents.
    pub fn document_labels(&self) -> DocumentLabels {
        match self {
            Locale::Russian => DocumentLabels::new("Сравнительный анализ ИИ", "Сравнение_ИИ"),
            Locale::English => DocumentLabels::new("AI comparative analysis", "AI_Comparison"),
        }
    }

    pub fn greeting(&self) -> String {
        match self {
            Locale::Russian => "Привет! Пришли два файла (PDF, DOCX, DOC или TXT). \
                 Сначала первый (эталон), потом второй (для сравнения)."
                .to_string(),
            Locale::English => "Hi! Send me two files (PDF, DOCX, DOC or TXT). \
                 First the reference document, then the one to compare against it."
                .to_string(),
        }
    }

    pub fn text_hint(&self) -> String {
        match self {
            Locale::Russian => "Отправь документ файлом. /start покажет инструкцию.".to_string(),
            Locale::English => "Send a document as a file. /start shows the instructions."
                .to_string(),
        }
    }

    pub fn unsupported_format(&self) -> String {
        match self {
            Locale::Russian => "Формат не поддерживается. Отправь PDF, DOCX, DOC или TXT.".to_string(),
            Locale::English => "Unsupported format. Send a PDF, DOCX, DOC or TXT file.".to_string(),
        }
    }

    pub fn extraction_failed(&self, cause: &str) -> String {
        match self {
            Locale::Russian => format!("Ошибка при чтении файла: {}", cause),
            Locale::English => format!("Could not read the file: {}", cause),
        }
    }

    pub fn file_received(&self, count: usize) -> String {
        match self {
            Locale::Russian => format!("Файл {} получен.", count),
            Locale::English => format!("File {} received.", count),
        }
    }

    pub fn analysing(&self) -> String {
        match self {
            Locale::Russian => "Анализирую документы...".to_string(),
            Locale::English => "Analysing the documents...".to_string(),
        }
    }

    pub fn sending_results(&self, formats: &[OutputFormat]) -> String {
        let list = self.join_formats(formats);
        match self {
            Locale::Russian => format!("Анализ завершён. Отправляю результат в форматах {}...", list),
            Locale::English => format!("Analysis complete. Sending the result as {}...", list),
        }
    }

    /// `index` is 1-based.
    pub fn empty_document(&self, index: usize) -> String {
        match self {
            Locale::Russian => format!(
                "В документе {} не найден текст. Отправь оба файла заново.",
                index
            ),
            Locale::English => format!(
                "Document {} contains no text. Please send both files again.",
                index
            ),
        }
    }

    pub fn prompt_too_large(&self) -> String {
        match self {
            Locale::Russian => {
                "Документы слишком большие для анализа. Сократи их и отправь снова.".to_string()
            }
            Locale::English => {
                "The documents are too large to analyse. Shorten them and try again.".to_string()
            }
        }
    }

    pub fn model_failed(&self, cause: &str) -> String {
        match self {
            Locale::Russian => format!("Ошибка OpenAI: {}", cause),
            Locale::English => format!("OpenAI error: {}", cause),
        }
    }

    pub fn render_failed(&self, cause: &str) -> String {
        match self {
            Locale::Russian => format!("Не удалось сформировать отчёт: {}", cause),
            Locale::English => format!("Could not build the report: {}", cause),
        }
    }

    pub fn delivery_failed(&self) -> String {
        match self {
            Locale::Russian => "Не удалось отправить отчёт. Попробуй ещё раз.".to_string(),
            Locale::English => "Could not deliver the report. Please try again.".to_string(),
        }
    }

    pub fn stopping(&self) -> String {
        match self {
            Locale::Russian => "Бот завершает работу.".to_string(),
            Locale::English => "The bot is shutting down.".to_string(),
        }
    }

    pub fn stop_denied(&self) -> String {
        match self {
            Locale::Russian => "У вас нет прав для остановки бота.".to_string(),
            Locale::English => "You are not allowed to stop the bot.".to_string(),
        }
    }

    pub fn download_failed(&self) -> String {
        match self {
            Locale::Russian => "Не удалось скачать файл. Попробуй ещё раз.".to_string(),
            Locale::English => "Could not download the file. Please try again.".to_string(),
        }
    }

    fn join_formats(&self, formats: &[OutputFormat]) -> String {
        let labels: Vec<&str> = formats.iter().map(|f| f.label()).collect();
        let last_sep = match self {
            Locale::Russian => " и ",
            Locale::English => " and ",
        };
        match labels.split_last() {
            None => String::new(),
            Some((last, [])) => last.to_string(),
            Some((last, rest)) => format!("{}{}{}", rest.join(", "), last_sep, last),
        }
    }
}
