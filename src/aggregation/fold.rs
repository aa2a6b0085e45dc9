/// Merging per-currency fragments into canonical multi-currency records
use std::collections::HashMap;

use crate::types::{CanonicalAsset, Currency, CurrencyValue, MarketFragment};

/// Asset id -> canonical record, in order of first observation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationMap {
    assets: Vec<CanonicalAsset>,
    index: HashMap<String, usize>,
}

impl AggregationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalAsset> {
        self.index.get(id).map(|&i| &self.assets[i])
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[CanonicalAsset] {
        &self.assets
    }

    pub fn into_assets(self) -> Vec<CanonicalAsset> {
        self.assets
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut CanonicalAsset> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.assets[i]),
            None => None,
        }
    }

    fn insert(&mut self, asset: CanonicalAsset) {
        self.index.insert(asset.id.clone(), self.assets.len());
        self.assets.push(asset);
    }
}

/// Apply one currency's fragments to the map.
///
/// A new asset id gets a fresh record whose currency-independent fields come
/// from this fragment. A known id only has `currency`'s slot written in each
/// currency-denominated field; its scalar fields stay as first observed.
pub fn fold(
    mut map: AggregationMap,
    currency: Currency,
    fragments: Vec<MarketFragment>,
) -> AggregationMap {
    for fragment in fragments {
        match map.get_mut(&fragment.id) {
            Some(existing) => merge_currency(existing, currency, &fragment),
            None => map.insert(new_asset(currency, fragment)),
        }
    }
    map
}

fn merge_currency(asset: &mut CanonicalAsset, currency: Currency, fragment: &MarketFragment) {
    asset.prices.set(currency, fragment.current_price);
    asset.market_cap.set(currency, fragment.market_cap);
    asset.fully_diluted_valuation.set(currency, fragment.fully_diluted_valuation);
    asset.total_volume.set(currency, fragment.total_volume);
    asset.high_24h.set(currency, fragment.high_24h);
    asset.low_24h.set(currency, fragment.low_24h);
    asset.price_change_24h.set(currency, fragment.price_change_24h);
    asset.market_cap_change_24h.set(currency, fragment.market_cap_change_24h);
    asset.ath.set(currency, fragment.ath);
    asset.atl.set(currency, fragment.atl);
}

fn new_asset(currency: Currency, fragment: MarketFragment) -> CanonicalAsset {
    let seed = |value: Option<f64>| CurrencyValue::seeded(currency, value);

    CanonicalAsset {
        prices: seed(fragment.current_price),
        market_cap: seed(fragment.market_cap),
        fully_diluted_valuation: seed(fragment.fully_diluted_valuation),
        total_volume: seed(fragment.total_volume),
        high_24h: seed(fragment.high_24h),
        low_24h: seed(fragment.low_24h),
        price_change_24h: seed(fragment.price_change_24h),
        market_cap_change_24h: seed(fragment.market_cap_change_24h),
        ath: seed(fragment.ath),
        atl: seed(fragment.atl),
        market_cap_rank: fragment.market_cap_rank,
        price_change_percentage_24h: fragment.price_change_percentage_24h,
        market_cap_change_percentage_24h: fragment.market_cap_change_percentage_24h,
        circulating_supply: fragment.circulating_supply,
        total_supply: fragment.total_supply,
        max_supply: fragment.max_supply,
        ath_change_percentage: fragment.ath_change_percentage,
        ath_date: fragment.ath_date,
        atl_change_percentage: fragment.atl_change_percentage,
        atl_date: fragment.atl_date,
        last_updated: fragment.last_updated,
        id: fragment.id,
        symbol: fragment.symbol,
        name: fragment.name,
        image: fragment.image,
    }
}
