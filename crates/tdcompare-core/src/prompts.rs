//! Comparison prompt templates.

use crate::locale::Locale;

const COMPARISON_PROMPT_RU: &str = r#"Сравни два технических документа. Выведи:
1. Параметры, которые совпадают.
2. Параметры, которые различаются.
3. Таблицу со столбцами: Параметр | Значение в документе 1 | Значение в документе 2 | Совпадение (да/нет).
   Разделяй столбцы символом "|", каждая строка таблицы на отдельной строке, первая строка - заголовок.
4. Краткий итог сравнения.

Документ 1:
{document_1}

Документ 2:
{document_2}
"#;

const COMPARISON_PROMPT_EN: &str = r#"Compare two technical documents. Output:
1. The parameters that match.
2. The parameters that differ.
3. A table with the columns: Parameter | Value in document 1 | Value in document 2 | Match (yes/no).
   Separate columns with the "|" character, one table row per line, the first row being the header.
4. A short summary of the comparison.

Document 1:
{document_1}

Document 2:
{document_2}
"#;

/// Build the comparison prompt for `locale` with both documents embedded.
pub fn comparison_prompt(locale: Locale, document_1: &str, document_2: &str) -> String {
    let template = match locale {
        Locale::Russian => COMPARISON_PROMPT_RU,
        Locale::English => COMPARISON_PROMPT_EN,
    };

    // Substitute document 2 first so a literal placeholder inside document 1
    // is never expanded.
    template
        .replacen("{document_2}", document_2, 1)
        .replacen("{document_1}", document_1, 1)
}
