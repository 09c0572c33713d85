//! PayFast 请求签名与回调校验
//!
//! 签名串：字段按出现顺序（发起请求时的构造顺序、回调时的表单提交顺序），
//! 排除 `signature`，每项渲染为 `key=urlencode(trim(value))`（空格编码为 `+`），
//! 以 `&` 连接；配置了 passphrase 时追加 `&passphrase=...`，最后取 MD5 小写十六进制。

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use subtle::ConstantTimeEq;

use crate::config::PayfastConfig;

/// 签名字段名
pub const SIGNATURE_FIELD: &str = "signature";
/// 回调中表示支付成功的 `payment_status`
pub const STATUS_COMPLETE: &str = "COMPLETE";
/// 回调金额与本地金额允许的误差
pub const AMOUNT_EPSILON: f64 = 0.01;

/// 请求/回调字段，保持插入顺序，即签名顺序
///
/// 表单反序列化为键值对序列，不会重排字段。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PayfastFields(Vec<(String, String)>);

impl PayfastFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第一个同名字段的值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 已存在则原位替换，否则追加到末尾
    pub fn insert(&mut self, key: String, value: String) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for PayfastFields {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

// 落库为 JSON 对象
impl Serialize for PayfastFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn encode_value(value: &str) -> String {
    urlencoding::encode(value.trim()).replace("%20", "+")
}

/// 构造待签名串
pub fn param_string(fields: &PayfastFields, passphrase: &str) -> String {
    let mut out = fields
        .iter()
        .filter(|(key, _)| *key != SIGNATURE_FIELD)
        .map(|(key, value)| format!("{}={}", key, encode_value(value)))
        .collect::<Vec<_>>()
        .join("&");

    if !passphrase.trim().is_empty() {
        out.push_str("&passphrase=");
        out.push_str(&encode_value(passphrase));
    }
    out
}

pub fn generate_signature(fields: &PayfastFields, passphrase: &str) -> String {
    format!("{:x}", md5::compute(param_string(fields, passphrase)))
}

/// 常量时间比较回调携带的签名；缺少签名视为无效
pub fn verify_signature(fields: &PayfastFields, passphrase: &str) -> bool {
    let Some(provided) = fields.get(SIGNATURE_FIELD) else {
        return false;
    };
    let expected = generate_signature(fields, passphrase);
    let provided = provided.trim().to_ascii_lowercase();
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// 网关跳转地址，查询串包含签名
pub fn redirect_url(process_url: &str, fields: &PayfastFields) -> String {
    let query = fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", process_url, query)
}

/// 发往网关的支付请求内容
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub user_id: String,
    pub amount: f64,
    pub item_name: String,
    pub item_description: String,
    pub email: String,
    pub phone: Option<String>,
}

/// 已签名的请求
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: String,
    pub signature: String,
    /// 含 `signature` 的全部字段
    pub fields: PayfastFields,
}

/// 构造并签名支付请求；回调地址挂在 `base_url` 下
pub fn build_payment_request(
    config: &PayfastConfig,
    base_url: &str,
    request: &PaymentRequest,
) -> SignedRequest {
    let base_url = base_url.trim_end_matches('/');
    let mut fields = PayfastFields::new();
    let mut put = |key: &str, value: String| {
        fields.insert(key.to_string(), value);
    };

    put("merchant_id", config.merchant_id.clone());
    put("merchant_key", config.merchant_key.clone());
    put("return_url", format!("{}/orders/success", base_url));
    put("cancel_url", format!("{}/orders/cancel", base_url));
    put("notify_url", format!("{}/api/payfast/ipn", base_url));
    put("email_address", request.email.clone());
    put("m_payment_id", request.order_id.clone());
    put("amount", format!("{:.2}", request.amount));
    put("item_name", request.item_name.clone());
    put("item_description", request.item_description.clone());
    if let Some(phone) = request.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        put("cell_number", phone.to_string());
    }
    put("custom_str1", request.user_id.clone());
    put("custom_str2", request.order_id.clone());
    put("custom_str3", request.payment_id.clone());

    let signature = generate_signature(&fields, &config.passphrase);
    fields.insert(SIGNATURE_FIELD.to_string(), signature.clone());

    SignedRequest {
        url: redirect_url(config.process_url(), &fields),
        signature,
        fields,
    }
}

/// 回调金额是否与本地金额一致
pub fn amount_matches(reported: f64, expected: f64) -> bool {
    // 100.01 - 100.00 在 f64 下略大于 0.01，按金额量级放宽一个舍入误差
    (reported - expected).abs() <= AMOUNT_EPSILON + f64::EPSILON * expected.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PayfastMode;

    fn config(passphrase: &str) -> PayfastConfig {
        PayfastConfig {
            merchant_id: "10000100".into(),
            merchant_key: "46f0cd694581a".into(),
            passphrase: passphrase.into(),
            mode: PayfastMode::Sandbox,
            sandbox_url: "https://sandbox.payfast.co.za/eng/process".into(),
            live_url: "https://www.payfast.co.za/eng/process".into(),
            currency: "PKR".into(),
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> PayfastFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_param_string_keeps_field_order() {
        let f = fields(&[
            ("item_name", "NFC_CARD x 2"),
            ("amount", " 100.00 "),
            ("signature", "ignored"),
        ]);
        assert_eq!(param_string(&f, ""), "item_name=NFC_CARD+x+2&amount=100.00");
        assert_eq!(
            param_string(&f, "my pass"),
            "item_name=NFC_CARD+x+2&amount=100.00&passphrase=my+pass"
        );
    }

    #[test]
    fn test_signature_is_md5_hex() {
        let f = fields(&[("a", "1")]);
        assert_eq!(
            generate_signature(&f, ""),
            format!("{:x}", md5::compute("a=1"))
        );
        assert_eq!(generate_signature(&f, "").len(), 32);
    }

    #[test]
    fn test_signature_depends_on_field_order() {
        let forward = fields(&[
            ("merchant_id", "10000100"),
            ("amount", "500.00"),
            ("custom_str3", "p1"),
        ]);
        let reversed = fields(&[
            ("custom_str3", "p1"),
            ("amount", "500.00"),
            ("merchant_id", "10000100"),
        ]);

        assert_ne!(
            generate_signature(&forward, "salt"),
            generate_signature(&reversed, "salt")
        );
        assert_eq!(
            generate_signature(&forward, "salt"),
            generate_signature(&forward.clone(), "salt")
        );
    }

    #[test]
    fn test_verify_gateway_ordered_notification() {
        // ITN 按网关提交顺序签名，空值字段同样参与
        let mut itn = fields(&[
            ("m_payment_id", "01AB"),
            ("pf_payment_id", "1089250"),
            ("payment_status", "COMPLETE"),
            ("item_name", "NFC_CARD x 2"),
            ("item_description", ""),
            ("amount_gross", "1000.00"),
            ("amount_fee", "-23.00"),
            ("amount_net", "977.00"),
            ("custom_str1", "u-1"),
            ("custom_str2", "01AB"),
            ("custom_str3", "pay-1"),
            ("name_first", ""),
            ("name_last", ""),
            ("email_address", "buyer@example.com"),
            ("merchant_id", "10000100"),
        ]);
        assert_eq!(
            param_string(&itn, "jt7NOE43FZPn"),
            "m_payment_id=01AB&pf_payment_id=1089250&payment_status=COMPLETE\
             &item_name=NFC_CARD+x+2&item_description=&amount_gross=1000.00\
             &amount_fee=-23.00&amount_net=977.00&custom_str1=u-1&custom_str2=01AB\
             &custom_str3=pay-1&name_first=&name_last=&email_address=buyer%40example.com\
             &merchant_id=10000100&passphrase=jt7NOE43FZPn"
        );

        itn.insert(
            SIGNATURE_FIELD.into(),
            "82e71eb7893734d1324396dbb401fc51".into(),
        );
        assert!(verify_signature(&itn, "jt7NOE43FZPn"));

        // 同一组字段按键名排序后签名不再匹配
        let mut sorted: Vec<(String, String)> = itn
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        sorted.sort();
        let sorted: PayfastFields = sorted.into_iter().collect();
        assert!(!verify_signature(&sorted, "jt7NOE43FZPn"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut f = fields(&[("a", "1"), ("b", "2")]);
        f.insert("a".into(), "9".into());
        f.insert("c".into(), "3".into());
        let pairs: Vec<(&str, &str)> = f.iter().collect();
        assert_eq!(pairs, [("a", "9"), ("b", "2"), ("c", "3")]);
        assert_eq!(f.remove("b"), Some("2".to_string()));
        assert!(!f.contains_key("b"));
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn test_any_field_change_changes_signature() {
        let base = fields(&[("amount", "500.00"), ("m_payment_id", "o1")]);
        let original = generate_signature(&base, "");

        let mut changed = base.clone();
        changed.insert("amount".into(), "500.01".into());
        assert_ne!(generate_signature(&changed, ""), original);

        let mut added = base.clone();
        added.insert("custom_str1".into(), "u1".into());
        assert_ne!(generate_signature(&added, ""), original);

        assert_ne!(generate_signature(&base, "pass"), original);
    }

    #[test]
    fn test_verify_signature() {
        let mut f = fields(&[("amount", "500.00"), ("payment_status", "COMPLETE")]);
        assert!(!verify_signature(&f, ""), "missing signature must fail");

        let sig = generate_signature(&f, "pp");
        f.insert(SIGNATURE_FIELD.into(), sig.clone());
        assert!(verify_signature(&f, "pp"));
        assert!(!verify_signature(&f, "other"));

        f.insert(SIGNATURE_FIELD.into(), sig.to_uppercase());
        assert!(verify_signature(&f, "pp"));

        f.insert("amount".into(), "1.00".into());
        assert!(!verify_signature(&f, "pp"));
    }

    #[test]
    fn test_build_payment_request() {
        let request = PaymentRequest {
            order_id: "order-1".into(),
            payment_id: "pay-1".into(),
            user_id: "user-1".into(),
            amount: 1000.0,
            item_name: "NFC_CARD x 2".into(),
            item_description: "Order #order-1".into(),
            email: "buyer@example.com".into(),
            phone: None,
        };
        let signed = build_payment_request(&config(""), "https://app.test/", &request);

        assert_eq!(signed.fields.get("amount"), Some("1000.00"));
        assert_eq!(
            signed.fields.get("notify_url"),
            Some("https://app.test/api/payfast/ipn")
        );
        assert_eq!(
            signed.fields.get("return_url"),
            Some("https://app.test/orders/success")
        );
        assert_eq!(signed.fields.get("custom_str3"), Some("pay-1"));
        assert!(!signed.fields.contains_key("cell_number"));
        assert_eq!(signed.fields.get(SIGNATURE_FIELD), Some(signed.signature.as_str()));

        let keys: Vec<&str> = signed.fields.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "merchant_id",
                "merchant_key",
                "return_url",
                "cancel_url",
                "notify_url",
                "email_address",
                "m_payment_id",
                "amount",
                "item_name",
                "item_description",
                "custom_str1",
                "custom_str2",
                "custom_str3",
                "signature",
            ]
        );
        assert!(verify_signature(&signed.fields, ""));

        assert!(signed.url.starts_with("https://sandbox.payfast.co.za/eng/process?"));
        assert!(signed.url.contains(&format!("signature={}", signed.signature)));
        assert!(signed.url.contains("item_name=NFC_CARD%20x%202"));
    }

    #[test]
    fn test_amount_tolerance() {
        assert!(amount_matches(100.005, 100.00));
        assert!(amount_matches(100.01, 100.00));
        assert!(!amount_matches(100.02, 100.00));
        assert!(!amount_matches(99.98, 100.00));
    }
}
