//! Static portfolio tables.

use super::{DegreeKind, Education, Experience, FunFact, Profile, SocialLink, TechCategory};

pub(super) const EXPERIENCES: &[Experience] = &[
    Experience {
        id: "stamina",
        company: "Stamina",
        role: "Founding Engineer",
        period: "08/2024 - Present",
        logo_initials: "ST",
        tech_stack: &[
            "TypeScript",
            "NestJS",
            "React",
            "Axios",
            "TanStack",
            "PostgreSQL",
            "TypeORM",
            "Redis",
            "Kafka",
            "Docker",
        ],
        achievements: &[
            "Defined authorization with secure cookies and global Axios client/interceptors.",
            "Improved perceived performance using Lazy loading, Suspense, and TanStack Router prefetching.",
            "Designed a flexible CRM entities model and deals/pipeline view.",
            "Validated CRM experience contributing to ~8% lift in sales for beta cohort.",
        ],
    },
    Experience {
        id: "hivepro",
        company: "Hive Pro",
        role: "Sr. Software Engineer",
        period: "04/2023 - 08/2024",
        logo_initials: "HP",
        tech_stack: &[
            "React",
            "Redux",
            "Saga",
            "Cypress",
            "Material UI",
            "Vue.js",
            "VueX",
            "Strapi",
            "Tailwind CSS",
            "Java",
            "Spring Boot",
            "PostgreSQL",
            "RabbitMQ",
            "Spring Batch",
            "Docker",
            "Gitlab",
            "CI/CD",
        ],
        achievements: &[
            "Managed deployments across dev, staging, production achieving 100% test coverage and zero rollbacks.",
            "Migrated frontend from React v16 to v18 and integrated Cypress code-coverage.",
            "Reduced QA cycle from 3 weeks to 1 week; eliminated 20% dead code.",
            "Delivered HivePro Lab marketing website using Vue.js with Strapi CMS.",
        ],
    },
    Experience {
        id: "born",
        company: "Born Group",
        role: "Software Engineer",
        period: "04/2022 - 06/2023",
        logo_initials: "BG",
        tech_stack: &[
            "Javascript",
            "TypeScript",
            "React",
            "Python",
            "Poetry",
            "Beautiful Soup",
            "Git",
        ],
        achievements: &[
            "Engineered high-speed scraping tool extracting 1000 keywords in under 20s.",
            "Lead Engineer for Walmart's California eCommerce site (scaled to 300 pages/month).",
            "Developed custom price distribution tool using MERN stack with OTP validation.",
            "Conducted detailed merge request reviews ensuring optimal UI practices.",
        ],
    },
    Experience {
        id: "insolutions",
        company: "In Solutions Global",
        role: "Jr. Software Engineer",
        period: "08/2019 - 12/2021",
        logo_initials: "NS",
        tech_stack: &["Java", "Spring Boot", "Hibernate", "JPQL"],
        achievements: &[
            "Achieved 99.9% accuracy in multi-currency transactions via optimized JPQL queries.",
            "Built RESTful APIs cutting backend defects by 25%.",
            "Refactored legacy services improving API response times by 40%.",
            "Reduced average ticket resolution time by 30% in agile sprints.",
        ],
    },
];

pub(super) const EDUCATION: &[Education] = &[
    Education {
        id: "masters",
        degree: "M.S. Computer Science",
        institution: "Central Michigan University",
        year: "08/2024 - 12/2025",
        details: "Advanced studies focused on scalable systems and intelligent algorithms.",
        kind: DegreeKind::Master,
        location: "Mount Pleasant, MI",
        badge: "CMU",
        courses: &[
            "Distributed Systems",
            "Cloud Computing",
            "Machine Learning",
            "Advanced Algorithms",
            "Network Security",
        ],
    },
    Education {
        id: "bachelors",
        degree: "B.E. Information Technology",
        institution: "Sinhgad Institute of Technology",
        year: "06/2015 - 07/2019",
        details: "Comprehensive foundation in computer science engineering and software development life cycle.",
        kind: DegreeKind::Bachelor,
        location: "Pune, India",
        badge: "SIT",
        courses: &[
            "Data Structures",
            "Object Oriented Programming",
            "DBMS",
            "Operating Systems",
            "Computer Networks",
            "Web Technology",
        ],
    },
];

pub(super) const PROFILE: Profile = Profile {
    name: "Anurag Ambekar",
    headline: "Founding Engineer",
    bio: "I love to work at the intersection of product, growth, and software. \
          Want to make each bit of my code count towards business impact.",
    avatar_url: "https://picsum.photos/200/200",
    badges: &["Product", "Software", "Growth"],
    links: &[
        SocialLink {
            label: "Github",
            href: "https://github.com/AnuragAmbekar741",
            download: None,
        },
        SocialLink {
            label: "LinkedIn",
            href: "https://www.linkedin.com/in/anurag-ambekar-a80b12217/",
            download: None,
        },
        SocialLink {
            label: "Email",
            href: "mailto:anuragambekar1997@gmail.com",
            download: None,
        },
        SocialLink {
            label: "Resume",
            href: "/AnuragAmbekar.pdf",
            download: Some("Anurag_Ambekar_Resume.pdf"),
        },
    ],
};

pub(super) const TECH_STACK: &[TechCategory] = &[
    TechCategory {
        title: "Frontend",
        skills: &[
            "React",
            "Next.js",
            "TypeScript",
            "Tailwind CSS",
            "Vue.js",
            "TanStack Query",
            "Axios",
        ],
    },
    TechCategory {
        title: "Backend",
        skills: &[
            "Node.js",
            "Java",
            "Spring Boot",
            "Python",
            "PostgreSQL",
            "GraphQL",
            "Rest API",
        ],
    },
    TechCategory {
        title: "Tools & DevOps",
        skills: &["AWS", "Docker", "Git", "Cypress", "Figma", "Jest", "CI/CD"],
    },
];

pub(super) const FUN_FACTS: &[FunFact] = &[
    FunFact {
        text: "Just like this theme I like my coffee black",
        emoji: "☕",
    },
    FunFact {
        text: "The way Itachi served Leaf Village I could serve you, just find me my purpose.",
        emoji: "🍥",
    },
    FunFact {
        text: "I am founder of abbreviation SLAP (Sound Like A Plan)",
        emoji: "🤝",
    },
    FunFact {
        text: "Big time Arsenal fan, once a Gooner always a Gooner",
        emoji: "⚽",
    },
];
