// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 目标市场为西语，消息目录仅提供 es（fallback = es）
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（如 "es"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use inventario::i18n::t;
/// let msg = t("product.not_found");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use inventario::i18n::t_with_args;
/// let msg = t_with_args("product.missing_field", &[("field", "sku")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_resolves_spanish() {
        // 未显式设置语言时也必须解析到 es 目录
        assert_eq!(t("product.not_found"), "Producto no encontrado");
        assert_eq!(t("product.stock_insufficient"), "Stock insuficiente");
    }

    #[test]
    fn test_t_with_args() {
        let msg = t_with_args("product.missing_field", &[("field", "sku")]);
        assert_eq!(msg, "Campo requerido faltante: sku");
    }

    #[test]
    fn test_missing_key_returns_key() {
        let msg = t("nonexistent.key.for.test");
        assert!(msg.contains("nonexistent.key.for.test"));
    }
}
