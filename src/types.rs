use fixed::types::I32F32;

pub const SPECIFICITY_ID: u32 = 0x10000;
pub const SPECIFICITY_CLASS: u32 = 0x100;
pub const SPECIFICITY_TAG: u32 = 1;

/// Cascade priority: origin band plus specificity in the integer part, a
/// strictly increasing insertion stamp in the fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(I32F32);

impl Priority {
    pub fn from_specificity(specificity: u32) -> Priority {
        let whole = specificity.min(i32::MAX as u32) as i64;
        Priority(I32F32::from_bits(whole << 32))
    }

    pub fn with_order(self, order: Order) -> Priority {
        Priority(self.0.saturating_add(order.0))
    }

    pub fn specificity(self) -> u32 {
        (self.0.to_bits() >> 32).max(0) as u32
    }
}

/// Fractional document-order stamp handed out by `Cascade::next_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Order(I32F32);

impl Order {
    pub(crate) const STEP: I32F32 = I32F32::from_bits(1);

    pub(crate) fn advance(&mut self) -> Order {
        // Stays below 1.0 for 2^32 - 1 insertions.
        self.0 = self.0.saturating_add(Self::STEP);
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    UserAgent,
    User,
    Author,
    StyleAttribute,
}

impl Origin {
    pub fn band(self, important: bool) -> u32 {
        match (self, important) {
            (Origin::UserAgent, false) => 0x1000000,
            (Origin::User, false) => 0x2000000,
            (Origin::Author, false) => 0x3000000,
            (Origin::StyleAttribute, false) => 0x4000000,
            (Origin::StyleAttribute, true) => 0x5000000,
            (Origin::Author, true) => 0x6000000,
            (Origin::User, true) => 0x7000000,
            (Origin::UserAgent, true) => 0x8000000,
        }
    }

    pub fn parse(raw: &str) -> Option<Origin> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ua" | "user-agent" => Some(Origin::UserAgent),
            "user" => Some(Origin::User),
            "author" => Some(Origin::Author),
            "style-attribute" => Some(Origin::StyleAttribute),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_never_reaches_the_integer_part() {
        let mut order = Order::default();
        for _ in 0..10_000 {
            order.advance();
        }
        let base = Priority::from_specificity(Origin::Author.band(false) + SPECIFICITY_TAG);
        let stamped = base.with_order(order);
        assert!(stamped > base);
        assert_eq!(stamped.specificity(), base.specificity());
        assert!(stamped < Priority::from_specificity(base.specificity() + 1));
    }

    #[test]
    fn important_bands_invert_origin_order() {
        assert!(Origin::Author.band(false) > Origin::User.band(false));
        assert!(Origin::User.band(true) > Origin::Author.band(true));
        assert!(Origin::UserAgent.band(true) > Origin::StyleAttribute.band(true));
        assert!(Origin::StyleAttribute.band(false) > Origin::Author.band(false));
    }

    #[test]
    fn parses_origin_names() {
        assert_eq!(Origin::parse("UA"), Some(Origin::UserAgent));
        assert_eq!(Origin::parse("author"), Some(Origin::Author));
        assert_eq!(Origin::parse("printer"), None);
    }
}
