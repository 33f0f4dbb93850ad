/// Arrow schemas and batch builders for tabular venue output.
pub mod tables {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;

    use crate::CoreError;
    use crate::venue::VenueRecord;
    use crate::viewport::VenueAnnotation;

    /// Schema for venue rows (one row per venue, all source columns plus the
    /// parsed position).
    pub fn venue_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("venue_type", DataType::Utf8, true),
            Field::new("address", DataType::Utf8, false),
            Field::new("address2", DataType::Utf8, true),
            Field::new("town", DataType::Utf8, false),
            Field::new("county", DataType::Utf8, false),
            Field::new("postcode", DataType::Utf8, false),
            Field::new("local_authority", DataType::Utf8, true),
            Field::new("telephone", DataType::Utf8, true),
            Field::new("website", DataType::Utf8, true),
            Field::new("photo", DataType::Utf8, true),
            Field::new("latitude", DataType::Float64, true),
            Field::new("longitude", DataType::Float64, true),
            Field::new("is_live", DataType::Utf8, true),
            Field::new("fsa_id", DataType::Int64, true),
            Field::new("slug", DataType::Utf8, true),
            Field::new("easting", DataType::Utf8, true),
            Field::new("northing", DataType::Utf8, true),
            Field::new("created_at", DataType::Utf8, true),
            Field::new("updated_at", DataType::Utf8, true),
        ])
    }

    /// Schema for the annotation list of one viewport pass.
    pub fn annotation_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("latitude", DataType::Float64, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("selected", DataType::Boolean, false),
        ])
    }

    /// Build a venue batch. Unparseable coordinates become nulls and the
    /// `NULL` website marker is dropped.
    pub fn venues_to_batch(venues: &[VenueRecord]) -> Result<RecordBatch, CoreError> {
        let coords: Vec<_> = venues.iter().map(VenueRecord::coordinate).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(venues.iter().map(|v| v.id))),
            utf8(venues.iter().map(|v| Some(v.name.as_str()))),
            utf8(venues.iter().map(|v| v.venue_type.as_deref())),
            utf8(venues.iter().map(|v| Some(v.address.as_str()))),
            utf8(venues.iter().map(|v| v.address2.as_deref())),
            utf8(venues.iter().map(|v| Some(v.town.as_str()))),
            utf8(venues.iter().map(|v| Some(v.county.as_str()))),
            utf8(venues.iter().map(|v| Some(v.postcode.as_str()))),
            utf8(venues.iter().map(|v| v.local_authority.as_deref())),
            utf8(venues.iter().map(|v| v.telephone.as_deref())),
            utf8(venues.iter().map(VenueRecord::website)),
            utf8(venues.iter().map(|v| v.photo.as_deref())),
            Arc::new(Float64Array::from(
                coords.iter().map(|c| c.map(|c| c.latitude)).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                coords.iter().map(|c| c.map(|c| c.longitude)).collect::<Vec<_>>(),
            )),
            utf8(venues.iter().map(|v| v.is_live.as_deref())),
            Arc::new(Int64Array::from(
                venues.iter().map(|v| v.fsa_id).collect::<Vec<_>>(),
            )),
            utf8(venues.iter().map(|v| v.slug.as_deref())),
            utf8(venues.iter().map(|v| v.easting.as_deref())),
            utf8(venues.iter().map(|v| v.northing.as_deref())),
            utf8(venues.iter().map(|v| v.created_at.as_deref())),
            utf8(venues.iter().map(|v| v.updated_at.as_deref())),
        ];

        Ok(RecordBatch::try_new(Arc::new(venue_schema()), columns)?)
    }

    /// Build an annotation batch, flagging the row whose id is `selected`.
    pub fn annotations_to_batch(
        annotations: &[VenueAnnotation],
        selected: Option<i64>,
    ) -> Result<RecordBatch, CoreError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(annotations.iter().map(|a| a.id))),
            utf8(annotations.iter().map(|a| Some(a.title.as_str()))),
            Arc::new(Float64Array::from_iter_values(
                annotations.iter().map(|a| a.coordinate.latitude),
            )),
            Arc::new(Float64Array::from_iter_values(
                annotations.iter().map(|a| a.coordinate.longitude),
            )),
            Arc::new(BooleanArray::from(
                annotations
                    .iter()
                    .map(|a| Some(a.id) == selected)
                    .collect::<Vec<_>>(),
            )),
        ];

        Ok(RecordBatch::try_new(
            Arc::new(annotation_schema()),
            columns,
        )?)
    }

    fn utf8<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
        Arc::new(values.collect::<StringArray>())
    }
}
