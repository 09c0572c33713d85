use crate::storage::{Material, ProductType};

/// 单价（货币单位）
pub fn unit_price(product: ProductType, material: Option<Material>) -> f64 {
    match product {
        ProductType::NfcCard => match material {
            Some(Material::Metal) => 500.0,
            _ => 250.0,
        },
        ProductType::QrSticker => 50.0,
        ProductType::Subscription => 999.0,
        ProductType::Remap => 100.0,
    }
}

/// 订单应付金额 = 单价 × 数量
pub fn order_amount(product: ProductType, material: Option<Material>, quantity: u32) -> f64 {
    unit_price(product, material) * f64::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nfc_card_pricing_by_material() {
        assert_eq!(order_amount(ProductType::NfcCard, Some(Material::Metal), 2), 1000.0);
        assert_eq!(order_amount(ProductType::NfcCard, Some(Material::Plastic), 1), 250.0);
        assert_eq!(order_amount(ProductType::NfcCard, Some(Material::Wood), 3), 750.0);
        assert_eq!(order_amount(ProductType::NfcCard, None, 1), 250.0);
    }

    #[test]
    fn test_flat_products_ignore_material() {
        assert_eq!(order_amount(ProductType::QrSticker, Some(Material::Metal), 4), 200.0);
        assert_eq!(order_amount(ProductType::Subscription, None, 1), 999.0);
        assert_eq!(order_amount(ProductType::Remap, None, 5), 500.0);
    }
}
