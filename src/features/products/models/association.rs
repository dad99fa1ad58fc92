use crate::features::taxonomy::TaxonomyKind;

/// Many-to-many relations between a product and a taxonomy table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssociationKind {
    Colors,
    Materials,
    Tags,
}

impl AssociationKind {
    pub const ALL: [AssociationKind; 3] = [
        AssociationKind::Colors,
        AssociationKind::Materials,
        AssociationKind::Tags,
    ];

    pub fn junction_table(self) -> &'static str {
        match self {
            AssociationKind::Colors => "product_colors",
            AssociationKind::Materials => "product_materials",
            AssociationKind::Tags => "product_tags",
        }
    }

    /// Column in the junction table referencing the target row
    pub fn target_column(self) -> &'static str {
        match self {
            AssociationKind::Colors => "color_id",
            AssociationKind::Materials => "material_id",
            AssociationKind::Tags => "tag_id",
        }
    }

    pub fn target(self) -> TaxonomyKind {
        match self {
            AssociationKind::Colors => TaxonomyKind::Colors,
            AssociationKind::Materials => TaxonomyKind::Materials,
            AssociationKind::Tags => TaxonomyKind::Tags,
        }
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.target().table())
    }
}
