use crate::parser::{DxfError, ParseMode};

/// 按行读取 (组码, 值) 对。修复模式下跳过无法解析的组码行以重新对齐。
pub(crate) struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
    mode: ParseMode,
    repairs: Vec<String>,
}

impl<'a> DxfReader<'a> {
    pub(crate) fn new(source: &'a str, mode: ParseMode) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
            mode,
            repairs: Vec::new(),
        }
    }

    pub(crate) fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        loop {
            let code_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => return Ok(None),
            };

            let code = match code_line.trim().parse::<i32>() {
                Ok(code) => code,
                Err(_) => {
                    let message = format!(
                        "第 {} 行的组码 \"{}\" 无法解析为整数",
                        self.line_number,
                        code_line.trim()
                    );
                    match self.mode {
                        ParseMode::Strict => return Err(DxfError::structure(message)),
                        ParseMode::Recover => {
                            // 丢弃一行后重新按 (组码, 值) 对齐。
                            self.repairs.push(format!("{message}，已跳过该行"));
                            continue;
                        }
                    }
                }
            };

            let value_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => {
                    let message = format!(
                        "文件在第 {} 行结束，缺少与组码对应的值行",
                        self.line_number
                    );
                    return match self.mode {
                        ParseMode::Strict => Err(DxfError::structure(message)),
                        ParseMode::Recover => {
                            self.repairs.push(format!("{message}，已丢弃末尾组码"));
                            Ok(None)
                        }
                    };
                }
            };

            let value = value_line.trim_end_matches('\r').to_string();
            return Ok(Some((code, value)));
        }
    }

    pub(crate) fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }

    pub(crate) fn take_repairs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.repairs)
    }
}
