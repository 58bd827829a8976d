use crate::error::LobbyError;
use crate::message::{GeofenceRegion, LatLng, RawLocation};
use std::convert::TryFrom;

impl TryFrom<RawLocation> for LatLng {
    type Error = LobbyError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        match (raw.lat, raw.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Ok(LatLng { lat, lng }),
            _ => Err(LobbyError::MalformedCoordinate),
        }
    }
}

impl GeofenceRegion {
    /// Latitudes are ordered so that `south_west.lat <= north_east.lat`.
    /// Longitudes are kept as drawn.
    pub fn new(south_west: LatLng, north_east: LatLng) -> Result<Self, LobbyError> {
        if !south_west.is_finite() || !north_east.is_finite() {
            return Err(LobbyError::MalformedCoordinate);
        }
        Ok(Self {
            south_west: LatLng::new(south_west.lat.min(north_east.lat), south_west.lng),
            north_east: LatLng::new(south_west.lat.max(north_east.lat), north_east.lng),
        })
    }

    /// Closed-bounds containment.
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }
}

/// Inside when no region is active, or when any region contains the point.
pub fn is_inside<'a, I>(point: &LatLng, regions: I) -> bool
where
    I: IntoIterator<Item = &'a GeofenceRegion>,
{
    let mut regions = regions.into_iter().peekable();
    if regions.peek().is_none() {
        return true;
    }
    regions.any(|region| region.contains(point))
}

/// `None` when there is nothing to evaluate: no location, a non-finite one, or
/// the `{0, 0}` placeholder.
pub fn containment<'a, I>(location: Option<&LatLng>, regions: I) -> Option<bool>
where
    I: IntoIterator<Item = &'a GeofenceRegion>,
{
    location
        .filter(|location| location.is_finite() && !location.is_null_island())
        .map(|location| is_inside(location, regions))
}
